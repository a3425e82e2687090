//! Spatial interpolation of scattered points
//!
//! Every algorithm answers one question: given a grid node and the sample
//! points around it, what value does the node get?
//! - Inverse distance to a power, with ellipse or nearest-neighbour search
//! - Moving average
//! - Nearest neighbour
//! - Data metrics (minimum, maximum, range, count, average distances)
//! - Linear interpolation on a Delaunay triangulation
//!
//! Point selection lives in [`search`], backed by an optional [`QuadTree`].

mod idw;
mod linear;
mod metrics;
mod moving_average;
mod nearest;
mod params;
mod point_set;
pub mod quadtree;
pub mod search;
mod triangulation;

pub use idw::{InverseDistanceNearestParams, InverseDistanceParams};
pub use linear::LinearParams;
pub use metrics::{DataMetric, DataMetricParams};
pub use moving_average::MovingAverageParams;
pub use nearest::NearestNeighborParams;
pub use params::GridAlgorithm;
pub use point_set::PointSet;
pub use quadtree::QuadTree;
pub use search::{NeighborLimits, SearchEllipse, SearchScratch};
pub use triangulation::Triangulation;

pub(crate) use idw::inverse_distance;
pub(crate) use linear::linear;
pub(crate) use metrics::data_metric;
pub(crate) use moving_average::moving_average;
pub(crate) use nearest::nearest_neighbor;

/// A sample point with x, y coordinates and a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }
}
