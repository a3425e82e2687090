//! Raster output: block sinks and GeoTIFF encoding

mod native;
mod sink;

pub use native::{
    read_geotiff_band, read_geotiff_band_from_buffer, write_geotiff, write_geotiff_to_buffer,
};
pub use sink::{MemoryRaster, RasterSink};
