/// Check a written class raster against the source raster it was derived from.
use serde::Serialize;

use crate::error::{LandclassError, Result};
use crate::grid::Grid;
use crate::mapping::MappingTable;

/// Mismatch positions kept in a report; the count covers all of them.
const MAX_RECORDED_MISMATCHES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub row: usize,
    pub col: usize,
    pub code: i32,
    pub expected: u8,
    pub found: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub checked: usize,
    pub mismatches: usize,
    pub first_mismatches: Vec<Mismatch>,
}

impl VerifyReport {
    pub fn is_exact(&self) -> bool {
        self.mismatches == 0
    }

    /// Percentage of cells holding the expected class.
    pub fn accuracy(&self) -> f64 {
        if self.checked == 0 {
            return 100.0;
        }
        (self.checked - self.mismatches) as f64 / self.checked as f64 * 100.0
    }
}

/// Compare every cell of `remapped` with `mapping` applied to `source`.
///
/// Fails if the shapes differ or if `source` holds codes the mapping does
/// not cover; cell mismatches are reported, not raised.
pub fn verify(source: &Grid<i32>, remapped: &Grid<u8>, mapping: &MappingTable) -> Result<VerifyReport> {
    source.ensure_same_shape(remapped)?;

    let coverage = mapping.coverage(source);
    if !coverage.is_complete() {
        return Err(LandclassError::UnmappedCodes {
            mapping: mapping.name().to_string(),
            codes: coverage.unmapped_codes(),
            cells: coverage.unmapped_cells(),
        });
    }

    let mut mismatches = 0usize;
    let mut first_mismatches = Vec::new();
    for (idx, (&code, &found)) in source.data.iter().zip(&remapped.data).enumerate() {
        let expected = mapping.require(code)?.code();
        if expected != found {
            mismatches += 1;
            if first_mismatches.len() < MAX_RECORDED_MISMATCHES {
                first_mismatches.push(Mismatch {
                    row: idx / source.width,
                    col: idx % source.width,
                    code,
                    expected,
                    found,
                });
            }
        }
    }

    let report = VerifyReport {
        checked: source.len(),
        mismatches,
        first_mismatches,
    };
    if report.is_exact() {
        tracing::info!(cells = report.checked, "verification passed");
    } else {
        tracing::warn!(
            mismatches = report.mismatches,
            accuracy = report.accuracy(),
            "verification found mismatched cells"
        );
    }
    Ok(report)
}
