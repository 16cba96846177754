use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the landclass core library.
#[derive(Debug, Error)]
pub enum LandclassError {
    /// One or more category codes in the input grid have no entry in the
    /// mapping table. `codes` is sorted ascending and deduplicated.
    #[error("{} category code(s) not in mapping {mapping:?}: {codes:?} ({cells} cell(s) affected)", .codes.len())]
    UnmappedCodes {
        mapping: String,
        codes: Vec<i32>,
        cells: usize,
    },

    #[error("mapping lists code {code} as both class {first} and class {second}")]
    ConflictingEntry { code: i32, first: u8, second: u8 },

    #[error("invalid simple class value {0} (expected 0-3)")]
    InvalidClass(i64),

    #[error("grid shape mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    ShapeMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    #[error("grid data length {len} does not match {width}x{height}")]
    DataLength { len: usize, width: usize, height: usize },

    #[error("malformed mapping file at line {line}: {reason}")]
    MalformedMapping { line: usize, reason: String },

    #[error("unsupported mapping file extension: {}", .0.display())]
    UnsupportedMappingFormat(PathBuf),

    #[error("unsupported raster sample format: {0}")]
    UnsupportedSampleFormat(&'static str),

    #[error("invalid raster dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("raster value {0} is outside the supported category code range")]
    CodeOutOfRange(i128),

    #[error("invalid job file: {0}")]
    InvalidJobs(String),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, LandclassError>;

impl LandclassError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
