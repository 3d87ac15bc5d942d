//! Sample storage types

use ndarray::Array3;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;

use super::grid::RasterData;
use crate::error::{Error, Result};

/// Storage type of the samples held by a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    /// Unsigned 8-bit (byte)
    U8,
    /// Signed 16-bit (short)
    I16,
    /// Unsigned 16-bit (ushort)
    U16,
    /// Signed 32-bit (int)
    I32,
    /// 32-bit float
    F32,
    /// 64-bit float (double)
    F64,
}

impl SampleType {
    /// Whether samples are stored as floating point
    pub fn is_float(&self) -> bool {
        matches!(self, SampleType::F32 | SampleType::F64)
    }

    /// Size of one sample in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            SampleType::U8 => 1,
            SampleType::I16 | SampleType::U16 => 2,
            SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SampleType::U8 => "u8",
            SampleType::I16 => "i16",
            SampleType::U16 => "u16",
            SampleType::I32 => "i32",
            SampleType::F32 => "f32",
            SampleType::F64 => "f64",
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "u8" | "byte" => Ok(SampleType::U8),
            "i16" | "short" => Ok(SampleType::I16),
            "u16" | "ushort" => Ok(SampleType::U16),
            "i32" | "int" => Ok(SampleType::I32),
            "f32" | "float" => Ok(SampleType::F32),
            "f64" | "double" => Ok(SampleType::F64),
            _ => Err(Error::UnsupportedDataType(s.to_string())),
        }
    }
}

/// Trait for the primitive types a raster can store.
///
/// Conversions follow numeric cast rules: floats are truncated toward zero
/// and saturated to the target range when stored in integer rasters (NaN
/// becomes 0), and doubles lose precision when stored as `f32`.
pub trait Sample:
    Copy + Clone + Debug + PartialOrd + PartialEq + Zero + Send + Sync + 'static
{
    /// Storage type tag for this primitive
    const SAMPLE_TYPE: SampleType;

    fn to_f64(self) -> f64;
    fn to_f32(self) -> f32;
    fn to_i32(self) -> i32;
    fn from_f64(value: f64) -> Self;
    fn from_f32(value: f32) -> Self;
    fn from_i32(value: i32) -> Self;

    /// Wrap a sample array into the tagged storage variant
    fn into_data(array: Array3<Self>) -> RasterData;
}

macro_rules! impl_sample {
    ($t:ty, $variant:ident) => {
        impl Sample for $t {
            const SAMPLE_TYPE: SampleType = SampleType::$variant;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn to_f32(self) -> f32 {
                self as f32
            }

            #[inline]
            fn to_i32(self) -> i32 {
                self as i32
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $t
            }

            #[inline]
            fn from_f32(value: f32) -> Self {
                value as $t
            }

            #[inline]
            fn from_i32(value: i32) -> Self {
                value as $t
            }

            fn into_data(array: Array3<Self>) -> RasterData {
                RasterData::$variant(array)
            }
        }
    };
}

// `as` between integers wraps instead of saturating, so integer storage
// clamps explicitly when fed an i32.
macro_rules! impl_sample_int {
    ($t:ty, $variant:ident) => {
        impl Sample for $t {
            const SAMPLE_TYPE: SampleType = SampleType::$variant;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn to_f32(self) -> f32 {
                self as f32
            }

            #[inline]
            fn to_i32(self) -> i32 {
                self as i32
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $t
            }

            #[inline]
            fn from_f32(value: f32) -> Self {
                value as $t
            }

            #[inline]
            fn from_i32(value: i32) -> Self {
                value.clamp(<$t>::MIN as i32, <$t>::MAX as i32) as $t
            }

            fn into_data(array: Array3<Self>) -> RasterData {
                RasterData::$variant(array)
            }
        }
    };
}

impl_sample_int!(u8, U8);
impl_sample_int!(i16, I16);
impl_sample_int!(u16, U16);
impl_sample!(i32, I32);
impl_sample!(f32, F32);
impl_sample!(f64, F64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_to_int_truncates_and_saturates() {
        assert_eq!(u8::from_f64(12.9), 12);
        assert_eq!(u8::from_f64(-4.0), 0);
        assert_eq!(u8::from_f64(300.0), 255);
        assert_eq!(i16::from_f64(-7.8), -7);
        assert_eq!(i32::from_f64(f64::NAN), 0);
    }

    #[test]
    fn test_int_saturates() {
        assert_eq!(u8::from_i32(300), 255);
        assert_eq!(u16::from_i32(-1), 0);
        assert_eq!(i16::from_i32(40_000), i16::MAX);
    }

    #[test]
    fn test_float_storage_truncates_precision() {
        let v = 0.1f64;
        assert_ne!(f32::from_f64(v).to_f64(), v);
        assert_eq!(f32::from_f64(v), 0.1f32);
    }

    #[test]
    fn test_sample_type_parse() {
        assert_eq!("float".parse::<SampleType>().unwrap(), SampleType::F32);
        assert_eq!("U16".parse::<SampleType>().unwrap(), SampleType::U16);
        assert!("u64".parse::<SampleType>().is_err());
    }
}
