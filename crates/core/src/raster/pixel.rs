//! Output pixel types and type-tagged pixel blocks

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Numeric type of an output raster band.
///
/// Names follow the usual GDAL spelling (`Byte`, `Int16`, `Float32`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelType {
    Byte,
    Int8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    #[default]
    Float64,
}

impl PixelType {
    pub const ALL: [PixelType; 8] = [
        PixelType::Byte,
        PixelType::Int8,
        PixelType::Int16,
        PixelType::UInt16,
        PixelType::Int32,
        PixelType::UInt32,
        PixelType::Float32,
        PixelType::Float64,
    ];

    /// Size of one sample in bytes
    pub fn size_bytes(self) -> usize {
        match self {
            PixelType::Byte | PixelType::Int8 => 1,
            PixelType::Int16 | PixelType::UInt16 => 2,
            PixelType::Int32 | PixelType::UInt32 | PixelType::Float32 => 4,
            PixelType::Float64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, PixelType::Float32 | PixelType::Float64)
    }

    pub fn is_signed(self) -> bool {
        !matches!(self, PixelType::Byte | PixelType::UInt16 | PixelType::UInt32)
    }

    pub fn name(self) -> &'static str {
        match self {
            PixelType::Byte => "Byte",
            PixelType::Int8 => "Int8",
            PixelType::Int16 => "Int16",
            PixelType::UInt16 => "UInt16",
            PixelType::Int32 => "Int32",
            PixelType::UInt32 => "UInt32",
            PixelType::Float32 => "Float32",
            PixelType::Float64 => "Float64",
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PixelType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnsupportedDataType(s.to_string()))
    }
}

/// A row-major block of pixels of one [`PixelType`].
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    Byte(Vec<u8>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

/// Expands `$body` once per buffer variant with `$v` bound to the inner Vec.
#[macro_export]
macro_rules! dispatch_pixel_buffer {
    ($buf:expr, $v:ident => $body:expr) => {
        match $buf {
            $crate::raster::PixelBuffer::Byte($v) => $body,
            $crate::raster::PixelBuffer::Int8($v) => $body,
            $crate::raster::PixelBuffer::Int16($v) => $body,
            $crate::raster::PixelBuffer::UInt16($v) => $body,
            $crate::raster::PixelBuffer::Int32($v) => $body,
            $crate::raster::PixelBuffer::UInt32($v) => $body,
            $crate::raster::PixelBuffer::Float32($v) => $body,
            $crate::raster::PixelBuffer::Float64($v) => $body,
        }
    };
}

impl PixelBuffer {
    /// Allocate a zeroed buffer of `len` samples.
    ///
    /// Fails with [`Error::Allocation`] instead of aborting when memory is
    /// short.
    pub fn try_zeroed(pixel_type: PixelType, len: usize) -> Result<Self> {
        fn alloc<T: Clone + Default>(len: usize, bytes: usize) -> Result<Vec<T>> {
            let mut v = Vec::new();
            v.try_reserve_exact(len)
                .map_err(|_| Error::Allocation { bytes })?;
            v.resize(len, T::default());
            Ok(v)
        }
        let bytes = len.saturating_mul(pixel_type.size_bytes());
        Ok(match pixel_type {
            PixelType::Byte => PixelBuffer::Byte(alloc(len, bytes)?),
            PixelType::Int8 => PixelBuffer::Int8(alloc(len, bytes)?),
            PixelType::Int16 => PixelBuffer::Int16(alloc(len, bytes)?),
            PixelType::UInt16 => PixelBuffer::UInt16(alloc(len, bytes)?),
            PixelType::Int32 => PixelBuffer::Int32(alloc(len, bytes)?),
            PixelType::UInt32 => PixelBuffer::UInt32(alloc(len, bytes)?),
            PixelType::Float32 => PixelBuffer::Float32(alloc(len, bytes)?),
            PixelType::Float64 => PixelBuffer::Float64(alloc(len, bytes)?),
        })
    }

    pub fn pixel_type(&self) -> PixelType {
        match self {
            PixelBuffer::Byte(_) => PixelType::Byte,
            PixelBuffer::Int8(_) => PixelType::Int8,
            PixelBuffer::Int16(_) => PixelType::Int16,
            PixelBuffer::UInt16(_) => PixelType::UInt16,
            PixelBuffer::Int32(_) => PixelType::Int32,
            PixelBuffer::UInt32(_) => PixelType::UInt32,
            PixelBuffer::Float32(_) => PixelType::Float32,
            PixelBuffer::Float64(_) => PixelType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        dispatch_pixel_buffer!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read sample `i` widened to f64
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        dispatch_pixel_buffer!(self, v => v.get(i).map(|x| *x as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("byte".parse::<PixelType>().unwrap(), PixelType::Byte);
        assert_eq!("UInt16".parse::<PixelType>().unwrap(), PixelType::UInt16);
        assert_eq!("FLOAT32".parse::<PixelType>().unwrap(), PixelType::Float32);
        assert!("Complex64".parse::<PixelType>().is_err());
    }

    #[test]
    fn test_sizes() {
        assert_eq!(PixelType::Byte.size_bytes(), 1);
        assert_eq!(PixelType::Int16.size_bytes(), 2);
        assert_eq!(PixelType::Float32.size_bytes(), 4);
        assert_eq!(PixelType::default().size_bytes(), 8);
    }

    #[test]
    fn test_zeroed_buffer() {
        let buf = PixelBuffer::try_zeroed(PixelType::Int32, 6).unwrap();
        assert_eq!(buf.pixel_type(), PixelType::Int32);
        assert_eq!(buf.len(), 6);
        assert_eq!(buf.get_f64(5), Some(0.0));
        assert_eq!(buf.get_f64(6), None);
    }
}
