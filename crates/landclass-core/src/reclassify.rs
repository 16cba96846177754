//! Land-use reclassification: category code grid → simple class grid.
//!
//! Unmapped codes fail the whole remap. The error lists every distinct
//! unmapped code so a single run surfaces all gaps in the table.

use std::collections::BTreeMap;

#[cfg(feature = "threading")]
use rayon::prelude::*;

use crate::class::SimpleClass;
use crate::error::{LandclassError, Result};
use crate::grid::Grid;
use crate::mapping::MappingTable;

/// Map every cell of `grid` through `mapping`.
///
/// The output has the input's shape and georeferencing. Fails with
/// [`LandclassError::UnmappedCodes`] if any code has no entry.
pub fn reclassify(grid: &Grid<i32>, mapping: &MappingTable) -> Result<Grid<SimpleClass>> {
    let (data, unmapped) = remap_all(&grid.data, grid.width, mapping);

    if !unmapped.is_empty() {
        let cells = unmapped.values().sum();
        let codes: Vec<i32> = unmapped.into_keys().collect();
        tracing::error!(
            mapping = mapping.name(),
            ?codes,
            cells,
            "category codes missing from mapping"
        );
        return Err(LandclassError::UnmappedCodes {
            mapping: mapping.name().to_string(),
            codes,
            cells,
        });
    }

    tracing::debug!(
        width = grid.width,
        height = grid.height,
        mapping = mapping.name(),
        "reclassified grid"
    );
    Ok(Grid {
        data,
        width: grid.width,
        height: grid.height,
        geo: grid.geo.clone(),
    })
}

/// [`reclassify`], yielding raw `u8` class codes ready for a raster writer.
pub fn reclassify_codes(grid: &Grid<i32>, mapping: &MappingTable) -> Result<Grid<u8>> {
    Ok(reclassify(grid, mapping)?.map(|c| c.code()))
}

type Unmapped = BTreeMap<i32, usize>;

fn remap_cells(cells: &[i32], mapping: &MappingTable) -> (Vec<SimpleClass>, Unmapped) {
    let mut out = Vec::with_capacity(cells.len());
    let mut unmapped = Unmapped::new();
    for &code in cells {
        match mapping.lookup(code) {
            Some(class) => out.push(class),
            None => *unmapped.entry(code).or_insert(0) += 1,
        }
    }
    (out, unmapped)
}

#[cfg(not(feature = "threading"))]
fn remap_all(cells: &[i32], _width: usize, mapping: &MappingTable) -> (Vec<SimpleClass>, Unmapped) {
    remap_cells(cells, mapping)
}

#[cfg(feature = "threading")]
fn remap_all(cells: &[i32], width: usize, mapping: &MappingTable) -> (Vec<SimpleClass>, Unmapped) {
    let rows: Vec<(Vec<SimpleClass>, Unmapped)> = cells
        .par_chunks(width.max(1))
        .map(|row| remap_cells(row, mapping))
        .collect();
    merge_rows(rows, cells.len())
}

/// Concatenates per-row remaps in row order and sums their unmapped counts.
#[cfg_attr(not(feature = "threading"), allow(dead_code))]
fn merge_rows(
    rows: impl IntoIterator<Item = (Vec<SimpleClass>, Unmapped)>,
    len: usize,
) -> (Vec<SimpleClass>, Unmapped) {
    let mut out = Vec::with_capacity(len);
    let mut unmapped = Unmapped::new();
    for (row, missing) in rows {
        out.extend(row);
        for (code, n) in missing {
            *unmapped.entry(code).or_insert(0) += n;
        }
    }
    (out, unmapped)
}
