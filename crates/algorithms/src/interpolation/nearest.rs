//! Nearest neighbour: value of the closest sample inside the search ellipse
//!
//! Produces a Voronoi-like tessellation. Equidistant samples resolve to the
//! lowest point index so the output does not depend on search order.

use super::search::{Neighborhood, SearchEllipse, SearchScratch};

/// Parameters for nearest neighbour (`nearest`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NearestNeighborParams {
    pub radius1: f64,
    pub radius2: f64,
    pub angle: f64,
    pub nodata: f64,
}

impl NearestNeighborParams {
    pub fn ellipse(&self) -> SearchEllipse {
        SearchEllipse::new(self.radius1, self.radius2, self.angle)
    }
}

pub(crate) fn nearest_neighbor(
    hood: &Neighborhood<'_>,
    nodata: f64,
    qx: f64,
    qy: f64,
    scratch: &mut SearchScratch,
) -> f64 {
    hood.nearest(qx, qy, scratch)
        .map_or(nodata, |c| hood.points.value(c.index))
}
