//! Linear interpolation on a Delaunay triangulation
//!
//! Inside the convex hull a node takes the plane through the three vertices
//! of its triangle. Outside, `radius` decides: negative uses the nearest
//! point at any distance, zero gives nodata, positive uses the nearest point
//! within `radius`.

use super::search::{Neighborhood, SearchEllipse, SearchScratch};
use super::Triangulation;

/// Parameters for `linear`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearParams {
    /// Fallback search radius outside the hull (default -1)
    pub radius: f64,
    pub nodata: f64,
}

impl Default for LinearParams {
    fn default() -> Self {
        Self {
            radius: -1.0,
            nodata: 0.0,
        }
    }
}

impl LinearParams {
    /// Ellipse used for the outside-hull fallback
    pub fn ellipse(&self) -> SearchEllipse {
        if self.radius > 0.0 {
            SearchEllipse::circle(self.radius)
        } else {
            SearchEllipse::new(0.0, 0.0, 0.0)
        }
    }
}

pub(crate) fn linear(
    triangulation: &Triangulation,
    hood: &Neighborhood<'_>,
    radius: f64,
    nodata: f64,
    qx: f64,
    qy: f64,
    scratch: &mut SearchScratch,
) -> f64 {
    if triangulation.is_empty() {
        return nodata;
    }
    if let Some(z) = triangulation.interpolate(hood.points, qx, qy) {
        return z;
    }
    if radius == 0.0 {
        return nodata;
    }
    hood.nearest(qx, qy, scratch)
        .map_or(nodata, |c| hood.points.value(c.index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::search::NeighborLimits;
    use crate::interpolation::{PointSet, SamplePoint};
    use approx::assert_relative_eq;

    fn plane() -> PointSet {
        PointSet::from_samples(&[
            SamplePoint::new(0.0, 0.0, 0.0),
            SamplePoint::new(10.0, 0.0, 10.0),
            SamplePoint::new(0.0, 10.0, 10.0),
            SamplePoint::new(10.0, 10.0, 20.0),
        ])
    }

    fn eval(points: &PointSet, params: &LinearParams, q: (f64, f64)) -> f64 {
        let tri = Triangulation::build(points);
        let hood = Neighborhood {
            points,
            index: None,
            ellipse: params.ellipse(),
            limits: NeighborLimits::default(),
            initial_radius: 1.0,
        };
        linear(&tri, &hood, params.radius, params.nodata, q.0, q.1, &mut SearchScratch::default())
    }

    #[test]
    fn test_inside_hull() {
        let p = LinearParams::default();
        assert_relative_eq!(eval(&plane(), &p, (5.0, 5.0)), 10.0, epsilon = 1e-9);
        assert_relative_eq!(eval(&plane(), &p, (2.0, 7.0)), 9.0, epsilon = 1e-9);
    }

    #[test]
    fn test_outside_hull_by_radius() {
        let unbounded = LinearParams::default();
        assert_eq!(eval(&plane(), &unbounded, (30.0, 30.0)), 20.0);

        let strict = LinearParams { radius: 0.0, nodata: -1.0 };
        assert_eq!(eval(&plane(), &strict, (30.0, 30.0)), -1.0);

        let bounded = LinearParams { radius: 2.0, nodata: -1.0 };
        assert_eq!(eval(&plane(), &bounded, (11.0, 11.0)), 20.0);
        assert_eq!(eval(&plane(), &bounded, (30.0, 30.0)), -1.0);
    }

    #[test]
    fn test_two_points_are_nodata() {
        let points = PointSet::from_samples(&[
            SamplePoint::new(0.0, 0.0, 1.0),
            SamplePoint::new(5.0, 5.0, 2.0),
        ]);
        let p = LinearParams { radius: -1.0, nodata: -9999.0 };
        assert_eq!(eval(&points, &p, (0.0, 0.0)), -9999.0);
        assert_eq!(eval(&points, &p, (2.5, 2.5)), -9999.0);
    }
}
