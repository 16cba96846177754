/// Cell counts per source code and per simple class.
use std::collections::BTreeMap;

use serde::Serialize;

use crate::class::SimpleClass;
use crate::grid::Grid;

/// Cell count per distinct code, ascending by code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeHistogram {
    counts: BTreeMap<i32, usize>,
}

impl CodeHistogram {
    pub fn from_grid(grid: &Grid<i32>) -> Self {
        let mut counts = BTreeMap::new();
        for &code in &grid.data {
            *counts.entry(code).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, usize)> + '_ {
        self.counts.iter().map(|(&k, &v)| (k, v))
    }

    pub fn count(&self, code: i32) -> usize {
        self.counts.get(&code).copied().unwrap_or(0)
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Merge another histogram into this one (multi-raster coverage checks).
    pub fn merge(&mut self, other: &CodeHistogram) {
        for (code, n) in other.iter() {
            *self.counts.entry(code).or_insert(0) += n;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeCount {
    pub code: i32,
    pub cells: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<SimpleClass>,
}

/// Which codes of a raster a mapping table does and does not cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub mapping: String,
    pub total_cells: usize,
    pub mapped: Vec<CodeCount>,
    pub unmapped: Vec<CodeCount>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.unmapped.is_empty()
    }

    pub fn unmapped_codes(&self) -> Vec<i32> {
        self.unmapped.iter().map(|c| c.code).collect()
    }

    pub fn unmapped_cells(&self) -> usize {
        self.unmapped.iter().map(|c| c.cells).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassShare {
    pub class: SimpleClass,
    pub name: &'static str,
    pub cells: usize,
    pub percent: f64,
}

/// Distribution of a remapped grid over the four simple classes. All four
/// classes are always present, in class order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStats {
    pub total_cells: usize,
    pub classes: [ClassShare; 4],
}

impl ClassStats {
    pub fn from_grid(grid: &Grid<SimpleClass>) -> Self {
        let mut counts = [0usize; 4];
        for class in &grid.data {
            counts[class.index()] += 1;
        }
        let total = grid.len();
        let share = |class: SimpleClass| {
            let cells = counts[class.index()];
            let percent = if total == 0 {
                0.0
            } else {
                cells as f64 / total as f64 * 100.0
            };
            ClassShare {
                class,
                name: class.name(),
                cells,
                percent,
            }
        };
        Self {
            total_cells: total,
            classes: SimpleClass::ALL.map(share),
        }
    }

    pub fn cells(&self, class: SimpleClass) -> usize {
        self.classes[class.index()].cells
    }

    pub fn percent(&self, class: SimpleClass) -> f64 {
        self.classes[class.index()].percent
    }

    /// Number of classes with at least one cell.
    pub fn present(&self) -> usize {
        self.classes.iter().filter(|s| s.cells > 0).count()
    }
}
