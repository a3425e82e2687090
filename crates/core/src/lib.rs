//! # SurtGrid Core
//!
//! Core types, traits and I/O for the SurtGrid gridding engine.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `PixelType` / `PixelBuffer`: runtime-typed output samples
//! - `CRS`: Coordinate Reference System tags
//! - Vector layers read from GeoJSON
//! - Raster sinks and native GeoTIFF output
//! - Progress reporting with cancellation

pub mod crs;
pub mod error;
pub mod io;
pub mod progress;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use progress::{NoProgress, Progress, ScaledProgress};
pub use raster::{GeoTransform, PixelBuffer, PixelType, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::io::{MemoryRaster, RasterSink};
    pub use crate::progress::{NoProgress, Progress};
    pub use crate::raster::{GeoTransform, PixelBuffer, PixelType, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, Feature, VectorLayer};
}
