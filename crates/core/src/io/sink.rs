//! Destination rasters that accept rectangular pixel blocks

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, PixelBuffer, PixelType, Raster, RasterElement};

/// A multi-band raster that receives its pixels block by block.
///
/// Implementations decide where the pixels go. The gridding writer only
/// needs the dimensions, the pixel type and the preferred block shape.
pub trait RasterSink {
    /// Raster width in pixels
    fn width(&self) -> usize;

    /// Raster height in pixels
    fn height(&self) -> usize;

    fn band_count(&self) -> usize;

    /// Pixel type every band stores
    fn pixel_type(&self) -> PixelType;

    /// Native block shape as (width, height)
    fn block_size(&self) -> (usize, usize);

    /// Store a row-major `width` x `height` block at (`x_off`, `y_off`) of
    /// band `band` (0-based).
    fn write_block(
        &mut self,
        band: usize,
        x_off: usize,
        y_off: usize,
        width: usize,
        height: usize,
        block: &PixelBuffer,
    ) -> Result<()>;
}

/// In-memory raster sink with one [`Raster<T>`] per band.
#[derive(Debug, Clone)]
pub struct MemoryRaster<T: RasterElement> {
    bands: Vec<Raster<T>>,
    width: usize,
    height: usize,
    block_size: (usize, usize),
}

impl<T: RasterElement> MemoryRaster<T> {
    /// Create `band_count` bands of `width` x `height`, each filled with the
    /// nodata value when one is given, zero otherwise.
    ///
    /// The native block is one full scanline, like a striped GeoTIFF.
    pub fn new(
        width: usize,
        height: usize,
        band_count: usize,
        transform: GeoTransform,
        crs: Option<CRS>,
        nodata: Option<f64>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let nodata = nodata.map(T::from_f64_saturating);
        let fill = nodata.unwrap_or_else(T::zero);
        let bands = (0..band_count)
            .map(|_| {
                let mut band = Raster::filled(height, width, fill);
                band.set_transform(transform);
                band.set_crs(crs.clone());
                band.set_nodata(nodata);
                band
            })
            .collect();

        Ok(Self {
            bands,
            width,
            height,
            block_size: (width, 1),
        })
    }

    /// Override the advertised native block shape
    pub fn with_block_size(mut self, block_width: usize, block_height: usize) -> Self {
        self.block_size = (block_width.max(1), block_height.max(1));
        self
    }

    pub fn bands(&self) -> &[Raster<T>] {
        &self.bands
    }

    pub fn band(&self, index: usize) -> Option<&Raster<T>> {
        self.bands.get(index)
    }

    pub fn into_bands(self) -> Vec<Raster<T>> {
        self.bands
    }
}

impl<T: RasterElement> RasterSink for MemoryRaster<T> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn pixel_type(&self) -> PixelType {
        T::PIXEL_TYPE
    }

    fn block_size(&self) -> (usize, usize) {
        self.block_size
    }

    fn write_block(
        &mut self,
        band: usize,
        x_off: usize,
        y_off: usize,
        width: usize,
        height: usize,
        block: &PixelBuffer,
    ) -> Result<()> {
        let samples = T::buffer_slice(block).ok_or_else(|| {
            Error::UnsupportedDataType(format!(
                "block of type {} written to {} raster",
                block.pixel_type(),
                T::PIXEL_TYPE
            ))
        })?;
        let count = self.bands.len();
        let target = self.bands.get_mut(band).ok_or_else(|| Error::InvalidParameter {
            name: "band",
            value: band.to_string(),
            reason: format!("raster has {} bands", count),
        })?;
        target.write_block(x_off, y_off, width, height, samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> MemoryRaster<u16> {
        MemoryRaster::new(4, 3, 2, GeoTransform::default(), None, Some(9.0)).unwrap()
    }

    #[test]
    fn test_initial_fill_is_nodata() {
        let raster = sink();
        assert_eq!(raster.band_count(), 2);
        assert_eq!(raster.block_size(), (4, 1));
        assert_eq!(raster.band(1).unwrap().get(2, 3).unwrap(), 9);
        assert_eq!(raster.band(0).unwrap().nodata(), Some(9));
    }

    #[test]
    fn test_write_block_into_band() {
        let mut raster = sink();
        let block = PixelBuffer::UInt16(vec![1, 2, 3, 4]);
        raster.write_block(1, 2, 1, 2, 2, &block).unwrap();
        let band = raster.band(1).unwrap();
        assert_eq!(band.get(1, 2).unwrap(), 1);
        assert_eq!(band.get(2, 3).unwrap(), 4);
        assert_eq!(raster.band(0).unwrap().get(1, 2).unwrap(), 9);
    }

    #[test]
    fn test_write_block_type_and_band_checks() {
        let mut raster = sink();
        let wrong = PixelBuffer::Float32(vec![0.0; 4]);
        assert!(raster.write_block(0, 0, 0, 2, 2, &wrong).is_err());
        let right = PixelBuffer::UInt16(vec![0; 4]);
        assert!(raster.write_block(2, 0, 0, 2, 2, &right).is_err());
    }
}
