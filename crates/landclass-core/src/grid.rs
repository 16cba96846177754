use serde::{Deserialize, Serialize};

use crate::error::{LandclassError, Result};

/// GeoTIFF georeferencing carried alongside a grid so that outputs are
/// written on exactly the same grid as their inputs. Tag payloads are kept
/// verbatim; nothing here is interpreted beyond [`GeoReference::bounds`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoReference {
    /// ModelPixelScaleTag: (sx, sy, sz).
    pub pixel_scale: Option<Vec<f64>>,
    /// ModelTiepointTag: one or more (i, j, k, x, y, z) sextuples.
    pub tiepoints: Option<Vec<f64>>,
    /// ModelTransformationTag: 4x4 row-major affine matrix.
    pub transformation: Option<Vec<f64>>,
    pub geo_key_directory: Option<Vec<u16>>,
    pub geo_double_params: Option<Vec<f64>>,
    pub geo_ascii_params: Option<String>,
    /// GDAL_NODATA as stored in the file.
    pub nodata: Option<String>,
}

impl GeoReference {
    pub fn is_empty(&self) -> bool {
        self == &GeoReference::default()
    }

    /// The GDAL nodata tag as a number. None when untagged or not numeric.
    pub fn nodata_value(&self) -> Option<f32> {
        self.nodata.as_deref()?.trim().parse().ok()
    }

    /// (min_x, min_y, max_x, max_y) in model space for a `width × height`
    /// north-up grid anchored by the first tiepoint. None without scale and
    /// tiepoint.
    pub fn bounds(&self, width: usize, height: usize) -> Option<(f64, f64, f64, f64)> {
        let scale = self.pixel_scale.as_ref()?;
        let tie = self.tiepoints.as_ref()?;
        if scale.len() < 2 || tie.len() < 6 {
            return None;
        }
        let (sx, sy) = (scale[0], scale[1]);
        let min_x = tie[3] - tie[0] * sx;
        let max_y = tie[4] + tie[1] * sy;
        let max_x = min_x + width as f64 * sx;
        let min_y = max_y - height as f64 * sy;
        Some((min_x, min_y, max_x, max_y))
    }
}

/// A 2D raster of cells, row-major, row 0 first as stored in the source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    pub data: Vec<T>,
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub geo: GeoReference,
}

impl<T: Clone> Grid<T> {
    /// Create a new grid filled with the given value.
    pub fn filled(width: usize, height: usize, fill: T) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
            geo: GeoReference::default(),
        }
    }
}

impl<T> Grid<T> {
    /// Wrap row-major `data`. Fails if the length is not `width × height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != width * height {
            return Err(LandclassError::DataLength {
                len: data.len(),
                width,
                height,
            });
        }
        Ok(Self {
            data,
            width,
            height,
            geo: GeoReference::default(),
        })
    }

    /// Build from nested rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(width * height);
        for row in rows {
            if row.len() != width {
                return Err(LandclassError::DataLength {
                    len: row.len(),
                    width,
                    height: 1,
                });
            }
            data.extend(row);
        }
        Self::from_vec(width, height, data)
    }

    pub fn with_geo(mut self, geo: GeoReference) -> Self {
        self.geo = geo;
        self
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> &T {
        &self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: T) {
        self.data[row * self.width + col] = val;
    }

    /// Iterate rows as slices. Yields nothing for a zero-width grid.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.data.chunks(self.width.max(1)).take(self.height)
    }

    /// Error unless `other` has the same width and height.
    pub fn ensure_same_shape<U>(&self, other: &Grid<U>) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(LandclassError::ShapeMismatch {
                expected_width: self.width,
                expected_height: self.height,
                width: other.width,
                height: other.height,
            });
        }
        Ok(())
    }

    /// Apply `f` to every cell, keeping shape and georeferencing.
    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Grid<U> {
        Grid {
            data: self.data.iter().map(f).collect(),
            width: self.width,
            height: self.height,
            geo: self.geo.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_is_row_major() {
        let g = Grid::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        assert_eq!(g.shape(), (3, 2));
        assert_eq!(*g.get(0, 2), 3);
        assert_eq!(*g.get(1, 0), 4);
        let rows: Vec<&[i32]> = g.rows().collect();
        assert_eq!(rows, vec![&[1, 2, 3][..], &[4, 5, 6][..]]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert!(Grid::from_rows(vec![vec![1, 2], vec![3]]).is_err());
    }

    #[test]
    fn from_vec_checks_length() {
        assert!(matches!(
            Grid::from_vec(2, 2, vec![0u8; 3]),
            Err(LandclassError::DataLength { len: 3, .. })
        ));
    }

    #[test]
    fn empty_grid_has_no_rows() {
        let g: Grid<i32> = Grid::from_rows(Vec::new()).unwrap();
        assert!(g.is_empty());
        assert_eq!(g.rows().count(), 0);
    }

    #[test]
    fn bounds_from_scale_and_tiepoint() {
        let geo = GeoReference {
            pixel_scale: Some(vec![0.5, 0.25, 0.0]),
            tiepoints: Some(vec![0.0, 0.0, 0.0, -8.0, 61.0, 0.0]),
            ..GeoReference::default()
        };
        let (min_x, min_y, max_x, max_y) = geo.bounds(4, 8).unwrap();
        assert!((min_x + 8.0).abs() < 1e-12);
        assert!((max_x + 6.0).abs() < 1e-12);
        assert!((max_y - 61.0).abs() < 1e-12);
        assert!((min_y - 59.0).abs() < 1e-12);
        assert!(GeoReference::default().bounds(4, 8).is_none());
    }
}
