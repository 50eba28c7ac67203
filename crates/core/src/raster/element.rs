//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Landsat products reserve the value `0` as fill (nodata) in every
/// integer band, and the composites keep that convention, so fill
/// detection here is a comparison against zero rather than a per-raster
/// nodata value.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// True for the fill value (`0`)
    fn is_fill(&self) -> bool {
        self.is_zero()
    }

    /// Lossy conversion to f64. NaN when the value does not fit.
    fn to_f64(self) -> f64 {
        NumCast::from(self).unwrap_or(f64::NAN)
    }

    /// Saturating conversion from f64; NaN maps to zero.
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_raster_element {
    ($t:ty, $float:expr) => {
        impl RasterElement for $t {
            fn is_float() -> bool {
                $float
            }

            fn from_f64(value: f64) -> Self {
                // `as` saturates at the type bounds and maps NaN to 0
                value as $t
            }
        }
    };
}

impl_raster_element!(u8, false);
impl_raster_element!(u16, false);
impl_raster_element!(u32, false);
impl_raster_element!(i16, false);
impl_raster_element!(i32, false);
impl_raster_element!(f32, true);
impl_raster_element!(f64, true);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturating_conversion() {
        assert_eq!(u16::from_f64(70_000.0), u16::MAX);
        assert_eq!(u16::from_f64(-5.0), 0);
        assert_eq!(u8::from_f64(f64::NAN), 0);
        assert_eq!(u16::from_f64(1234.9), 1234);
    }

    #[test]
    fn fill_is_zero() {
        assert!(0u16.is_fill());
        assert!(!1u16.is_fill());
        assert!(0.0f32.is_fill());
    }
}
