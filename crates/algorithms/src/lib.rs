//! # SurtGrid Algorithms
//!
//! Turns scattered points into regular rasters.
//!
//! ## Modules
//!
//! - **interpolation**: point set, quadtree, search neighbourhoods and the
//!   gridding algorithms (inverse distance, moving average, nearest
//!   neighbour, data metrics, linear)
//! - **gridding**: grid context, layer-to-points extraction, tiled output
//!   and multi-layer jobs

pub mod gridding;
pub mod interpolation;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::gridding::{
        extract_points, ExtractOptions, Extent, GridContext, GridJob, GridOptions, GridReport,
        OutputSize, TiledGridWriter,
    };
    pub use crate::interpolation::{
        DataMetric, GridAlgorithm, PointSet, QuadTree, SamplePoint, Triangulation,
    };
    pub use surtgrid_core::prelude::*;
}
