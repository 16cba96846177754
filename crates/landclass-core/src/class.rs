/// The coarse 4-bucket land-use scheme all source classifications are
/// reduced to before emission and deposition calculations.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LandclassError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SimpleClass {
    /// Water, urban, bare ground, snow/ice and no-data.
    Other = 0,
    Cropland = 1,
    /// Grassland, shrubland, wetlands and sparse vegetation.
    Grass = 2,
    Forest = 3,
}

impl SimpleClass {
    pub const ALL: [SimpleClass; 4] = [
        SimpleClass::Other,
        SimpleClass::Cropland,
        SimpleClass::Grass,
        SimpleClass::Forest,
    ];

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            SimpleClass::Other => "Other",
            SimpleClass::Cropland => "Cropland",
            SimpleClass::Grass => "Grass",
            SimpleClass::Forest => "Forest",
        }
    }

    /// Long description, written to the output raster's band metadata.
    pub fn description(self) -> &'static str {
        match self {
            SimpleClass::Other => "Other (water, urban, bare, no data)",
            SimpleClass::Cropland => "Cropland",
            SimpleClass::Grass => "Grass (grassland, shrubland, wetlands)",
            SimpleClass::Forest => "Forest",
        }
    }
}

impl TryFrom<u8> for SimpleClass {
    type Error = LandclassError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(v))
    }
}

impl TryFrom<i64> for SimpleClass {
    type Error = LandclassError;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(SimpleClass::Other),
            1 => Ok(SimpleClass::Cropland),
            2 => Ok(SimpleClass::Grass),
            3 => Ok(SimpleClass::Forest),
            other => Err(LandclassError::InvalidClass(other)),
        }
    }
}

impl From<SimpleClass> for u8 {
    fn from(c: SimpleClass) -> u8 {
        c.code()
    }
}

impl fmt::Display for SimpleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_contiguous_from_zero() {
        for (i, class) in SimpleClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), i);
            assert_eq!(SimpleClass::try_from(class.code()).unwrap(), *class);
        }
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        assert!(matches!(
            SimpleClass::try_from(4u8),
            Err(LandclassError::InvalidClass(4))
        ));
        assert!(SimpleClass::try_from(-1i64).is_err());
    }

    #[test]
    fn serializes_as_plain_code() {
        assert_eq!(serde_json::to_string(&SimpleClass::Grass).unwrap(), "2");
        let c: SimpleClass = serde_json::from_str("3").unwrap();
        assert_eq!(c, SimpleClass::Forest);
        assert!(serde_json::from_str::<SimpleClass>("7").is_err());
    }
}
