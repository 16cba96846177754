//! Land-use reclassification for emission and deposition inputs.
//!
//! Source land-cover rasters (ESA CCI and the UK scenario generator's
//! variants) are reduced to four simple classes through a total lookup table.
//! Codes missing from the table fail the run.

pub mod class;
pub mod error;
pub mod factors;
pub mod grid;
pub mod jobs;
pub mod mapping;
pub mod raster;
pub mod reclassify;
pub mod stats;
pub mod verify;

pub use class::SimpleClass;
pub use error::{LandclassError, Result};
pub use factors::{apply_class_factors, ClassFactors};
pub use grid::{GeoReference, Grid};
pub use jobs::{Job, JobFile};
pub use mapping::MappingTable;
pub use raster::{RasterCompression, WriteOptions};
pub use reclassify::{reclassify, reclassify_codes};
pub use stats::{ClassStats, CodeHistogram, CoverageReport};
pub use verify::{verify, VerifyReport};
