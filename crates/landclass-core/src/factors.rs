/// Per-class multiplicative factors applied over a continuous field, e.g.
/// scaling a deposition velocity grid by land-use class.
use serde::{Deserialize, Serialize};

use crate::class::SimpleClass;
use crate::error::Result;
use crate::grid::Grid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassFactors {
    pub other: f32,
    pub cropland: f32,
    pub grass: f32,
    pub forest: f32,
}

impl ClassFactors {
    /// Factors in class order: Other, Cropland, Grass, Forest.
    pub fn new(factors: [f32; 4]) -> Self {
        let [other, cropland, grass, forest] = factors;
        Self {
            other,
            cropland,
            grass,
            forest,
        }
    }

    /// Deposition velocity scaling relative to forest canopy.
    pub fn deposition_velocity() -> Self {
        Self::new([0.25, 0.5, 0.5, 1.0])
    }

    #[inline]
    pub fn get(&self, class: SimpleClass) -> f32 {
        match class {
            SimpleClass::Other => self.other,
            SimpleClass::Cropland => self.cropland,
            SimpleClass::Grass => self.grass,
            SimpleClass::Forest => self.forest,
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl Default for ClassFactors {
    fn default() -> Self {
        Self::deposition_velocity()
    }
}

/// `field × factors[class]` cell by cell. `classes` and `field` must have the
/// same shape; the output takes `field`'s georeferencing, nodata tag included.
/// Cells equal to the field's nodata value are copied unscaled. NaN propagates.
pub fn apply_class_factors(
    classes: &Grid<SimpleClass>,
    field: &Grid<f32>,
    factors: &ClassFactors,
) -> Result<Grid<f32>> {
    classes.ensure_same_shape(field)?;
    let nodata = field.geo.nodata_value();
    let data = classes
        .data
        .iter()
        .zip(&field.data)
        .map(|(&class, &v)| if Some(v) == nodata { v } else { v * factors.get(class) })
        .collect();
    Ok(Grid {
        data,
        width: field.width,
        height: field.height,
        geo: field.geo.clone(),
    })
}
