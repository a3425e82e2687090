//! Gridding jobs: from vector layers to raster bands
//!
//! [`extract_points`] turns a layer into a [`PointSet`](crate::interpolation::PointSet),
//! [`GridContext`] evaluates an algorithm over any window of the output,
//! [`TiledGridWriter`] drives it tile by tile into a
//! [`RasterSink`](surtgrid_core::io::RasterSink) and [`GridJob`] ties the
//! steps together for several layers.

mod context;
mod extract;
mod job;
mod options;
mod writer;

pub use context::GridContext;
pub use extract::{extract_points, ExtractOptions};
pub use job::{GridJob, GridReport, LayerReport, LayerStatus};
pub use options::{Extent, GridOptions, OutputGeometry, OutputSize, DEFAULT_OUTPUT_SIZE};
pub use writer::TiledGridWriter;
