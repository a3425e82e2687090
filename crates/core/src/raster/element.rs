//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

use super::{PixelBuffer, PixelType};

/// Trait for types that can be stored in a raster cell.
///
/// Every implementor maps to exactly one [`PixelType`], which is how blocks
/// of that type are tagged when handed to a raster sink.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Pixel type tag of this element
    const PIXEL_TYPE: PixelType;

    /// Minimum value representable by this type
    fn min_value() -> Self;

    /// Maximum value representable by this type
    fn max_value() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Convert an interpolated value into this type.
    ///
    /// Integer types round to nearest and clamp to their range, NaN becomes 0.
    /// Float types use a plain `as` cast.
    fn from_f64_saturating(value: f64) -> Self;

    /// Borrow the samples of a buffer tagged with this element's type
    fn buffer_slice(buf: &PixelBuffer) -> Option<&[Self]>;

    /// Mutably borrow the samples of a buffer tagged with this element's type
    fn buffer_slice_mut(buf: &mut PixelBuffer) -> Option<&mut [Self]>;

    /// Wrap samples into a type-tagged buffer
    fn into_buffer(values: Vec<Self>) -> PixelBuffer;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_raster_element_int {
    ($t:ty, $var:ident) => {
        impl RasterElement for $t {
            const PIXEL_TYPE: PixelType = PixelType::$var;

            fn min_value() -> Self {
                <$t>::MIN
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                match nodata {
                    Some(nd) => *self == nd,
                    None => false,
                }
            }

            fn is_float() -> bool {
                false
            }

            #[inline]
            fn from_f64_saturating(value: f64) -> Self {
                if value.is_nan() {
                    return 0;
                }
                // `as` saturates at the type bounds.
                value.round() as $t
            }

            fn buffer_slice(buf: &PixelBuffer) -> Option<&[Self]> {
                match buf {
                    PixelBuffer::$var(v) => Some(v.as_slice()),
                    _ => None,
                }
            }

            fn buffer_slice_mut(buf: &mut PixelBuffer) -> Option<&mut [Self]> {
                match buf {
                    PixelBuffer::$var(v) => Some(v.as_mut_slice()),
                    _ => None,
                }
            }

            fn into_buffer(values: Vec<Self>) -> PixelBuffer {
                PixelBuffer::$var(values)
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty, $var:ident) => {
        impl RasterElement for $t {
            const PIXEL_TYPE: PixelType = PixelType::$var;

            fn min_value() -> Self {
                <$t>::MIN
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    None => false,
                }
            }

            fn is_float() -> bool {
                true
            }

            #[inline]
            fn from_f64_saturating(value: f64) -> Self {
                value as $t
            }

            fn buffer_slice(buf: &PixelBuffer) -> Option<&[Self]> {
                match buf {
                    PixelBuffer::$var(v) => Some(v.as_slice()),
                    _ => None,
                }
            }

            fn buffer_slice_mut(buf: &mut PixelBuffer) -> Option<&mut [Self]> {
                match buf {
                    PixelBuffer::$var(v) => Some(v.as_mut_slice()),
                    _ => None,
                }
            }

            fn into_buffer(values: Vec<Self>) -> PixelBuffer {
                PixelBuffer::$var(values)
            }
        }
    };
}

impl_raster_element_int!(u8, Byte);
impl_raster_element_int!(i8, Int8);
impl_raster_element_int!(i16, Int16);
impl_raster_element_int!(u16, UInt16);
impl_raster_element_int!(i32, Int32);
impl_raster_element_int!(u32, UInt32);
impl_raster_element_float!(f32, Float32);
impl_raster_element_float!(f64, Float64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_conversion_rounds_and_clamps() {
        assert_eq!(u8::from_f64_saturating(2.5), 3);
        assert_eq!(u8::from_f64_saturating(-4.0), 0);
        assert_eq!(u8::from_f64_saturating(1e9), 255);
        assert_eq!(i16::from_f64_saturating(-1.6), -2);
        assert_eq!(i16::from_f64_saturating(-1e9), i16::MIN);
        assert_eq!(u32::from_f64_saturating(f64::NAN), 0);
    }

    #[test]
    fn test_float_conversion() {
        assert_eq!(f32::from_f64_saturating(0.5), 0.5f32);
        assert!(f64::from_f64_saturating(f64::NAN).is_nan());
    }

    #[test]
    fn test_buffer_views() {
        let mut buf = i16::into_buffer(vec![1, 2, 3]);
        assert_eq!(buf.pixel_type(), PixelType::Int16);
        assert_eq!(i16::buffer_slice(&buf), Some(&[1i16, 2, 3][..]));
        assert!(f32::buffer_slice(&buf).is_none());
        if let Some(v) = i16::buffer_slice_mut(&mut buf) {
            v[0] = 7;
        }
        assert_eq!(buf.get_f64(0), Some(7.0));
    }

    #[test]
    fn test_pixel_type_tags() {
        assert_eq!(u8::PIXEL_TYPE, PixelType::Byte);
        assert_eq!(f64::PIXEL_TYPE, PixelType::Float64);
    }
}
