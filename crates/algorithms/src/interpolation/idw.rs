//! Inverse Distance to a Power
//!
//! Estimates a node as the weighted average of the sample values around it,
//! where each weight is the inverse of the (smoothed) distance raised to a
//! power:
//!
//! ```text
//! z = Σ(wi * zi) / Σ(wi),   wi = 1 / (di² + s²)^(p/2)
//! ```
//!
//! Reference:
//! Shepard, D. (1968). A two-dimensional interpolation function for
//! irregularly-spaced data. ACM National Conference.

use super::search::{NeighborLimits, Neighborhood, SearchEllipse, SearchScratch, Selection};

/// Parameters of the ellipse-search variant (`invdist`)
#[derive(Debug, Clone, PartialEq)]
pub struct InverseDistanceParams {
    /// Weighting power (default 2)
    pub power: f64,
    /// Smoothing added to every distance
    pub smoothing: f64,
    /// Semi-axis of the search ellipse along X; 0 together with `radius2`
    /// means every point is used
    pub radius1: f64,
    /// Semi-axis of the search ellipse along Y
    pub radius2: f64,
    /// Counter-clockwise ellipse rotation in degrees
    pub angle: f64,
    /// Use at most this many closest points (0 = all)
    pub max_points: usize,
    /// Below this many points the node is nodata
    pub min_points: usize,
    pub min_points_per_quadrant: usize,
    pub max_points_per_quadrant: usize,
    pub nodata: f64,
}

impl Default for InverseDistanceParams {
    fn default() -> Self {
        Self {
            power: 2.0,
            smoothing: 0.0,
            radius1: 0.0,
            radius2: 0.0,
            angle: 0.0,
            max_points: 0,
            min_points: 0,
            min_points_per_quadrant: 0,
            max_points_per_quadrant: 0,
            nodata: 0.0,
        }
    }
}

impl InverseDistanceParams {
    pub fn ellipse(&self) -> SearchEllipse {
        SearchEllipse::new(self.radius1, self.radius2, self.angle)
    }

    pub fn limits(&self) -> NeighborLimits {
        NeighborLimits {
            min_points: self.min_points,
            max_points: self.max_points,
            min_points_per_quadrant: self.min_points_per_quadrant,
            max_points_per_quadrant: self.max_points_per_quadrant,
        }
    }
}

/// Parameters of the nearest-neighbour search variant (`invdistnn`)
#[derive(Debug, Clone, PartialEq)]
pub struct InverseDistanceNearestParams {
    pub power: f64,
    pub smoothing: f64,
    /// Circular search radius, must be positive (default 1)
    pub radius: f64,
    /// Use at most this many closest points (default 12, 0 = all)
    pub max_points: usize,
    pub min_points: usize,
    pub min_points_per_quadrant: usize,
    pub max_points_per_quadrant: usize,
    pub nodata: f64,
}

impl Default for InverseDistanceNearestParams {
    fn default() -> Self {
        Self {
            power: 2.0,
            smoothing: 0.0,
            radius: 1.0,
            max_points: 12,
            min_points: 0,
            min_points_per_quadrant: 0,
            max_points_per_quadrant: 0,
            nodata: 0.0,
        }
    }
}

impl InverseDistanceNearestParams {
    pub fn ellipse(&self) -> SearchEllipse {
        SearchEllipse::circle(self.radius)
    }

    pub fn limits(&self) -> NeighborLimits {
        NeighborLimits {
            min_points: self.min_points,
            max_points: self.max_points,
            min_points_per_quadrant: self.min_points_per_quadrant,
            max_points_per_quadrant: self.max_points_per_quadrant,
        }
    }
}

/// Weighted average at (qx, qy) over the node's neighbourhood.
///
/// A point coinciding with the node returns its own value whatever the
/// power. Too few points, a quadrant shortfall or a zero weight sum give
/// `nodata`.
pub(crate) fn inverse_distance(
    hood: &Neighborhood<'_>,
    power: f64,
    smoothing: f64,
    nodata: f64,
    qx: f64,
    qy: f64,
    scratch: &mut SearchScratch,
) -> f64 {
    let smoothing_sq = smoothing * smoothing;
    match hood.select(qx, qy, Some(smoothing_sq), scratch) {
        Selection::ExactHit(i) => return hood.points.value(i),
        Selection::QuadrantShortfall => return nodata,
        Selection::Complete => {}
    }

    let candidates = &scratch.candidates;
    if candidates.len() < hood.limits.min_points {
        return nodata;
    }

    let half_power = power / 2.0;
    let mut sum_w = 0.0;
    let mut sum_wz = 0.0;
    for c in candidates {
        let w = 1.0 / (c.dist_sq + smoothing_sq).powf(half_power);
        sum_w += w;
        sum_wz += w * hood.points.value(c.index);
    }

    if sum_w == 0.0 {
        nodata
    } else {
        sum_wz / sum_w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::{PointSet, SamplePoint};
    use approx::assert_relative_eq;

    fn corners() -> PointSet {
        PointSet::from_samples(&[
            SamplePoint::new(0.0, 0.0, 1.0),
            SamplePoint::new(10.0, 0.0, 2.0),
            SamplePoint::new(0.0, 10.0, 3.0),
            SamplePoint::new(10.0, 10.0, 4.0),
        ])
    }

    fn eval(points: &PointSet, params: &InverseDistanceParams, q: (f64, f64)) -> f64 {
        let hood = Neighborhood {
            points,
            index: None,
            ellipse: params.ellipse(),
            limits: params.limits(),
            initial_radius: 1.0,
        };
        let mut scratch = SearchScratch::default();
        inverse_distance(
            &hood,
            params.power,
            params.smoothing,
            params.nodata,
            q.0,
            q.1,
            &mut scratch,
        )
    }

    #[test]
    fn test_center_is_average() {
        let v = eval(&corners(), &InverseDistanceParams::default(), (5.0, 5.0));
        assert_relative_eq!(v, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_exact_hit_independent_of_power() {
        let pts = corners();
        for power in [0.5, 2.0, 7.0] {
            let params = InverseDistanceParams {
                power,
                ..Default::default()
            };
            for i in 0..pts.len() {
                let v = eval(&pts, &params, (pts.x(i), pts.y(i)));
                assert_eq!(v, pts.value(i));
            }
        }
    }

    #[test]
    fn test_weighted_toward_nearest() {
        let v = eval(&corners(), &InverseDistanceParams::default(), (1.0, 1.0));
        assert!(v > 1.0 && v < 2.5);
    }

    #[test]
    fn test_power_sharpens() {
        let low = InverseDistanceParams {
            power: 1.0,
            ..Default::default()
        };
        let high = InverseDistanceParams {
            power: 6.0,
            ..Default::default()
        };
        let a = eval(&corners(), &low, (2.0, 2.0));
        let b = eval(&corners(), &high, (2.0, 2.0));
        assert!(b < a, "higher power should pull toward the nearest value");
    }

    #[test]
    fn test_radius_and_min_points() {
        let params = InverseDistanceParams {
            radius1: 3.0,
            radius2: 3.0,
            min_points: 1,
            nodata: -9999.0,
            ..Default::default()
        };
        assert_eq!(eval(&corners(), &params, (5.0, 5.0)), -9999.0);
        assert_relative_eq!(eval(&corners(), &params, (1.0, 1.0)), 1.0);
    }

    #[test]
    fn test_empty_neighbourhood_is_nodata() {
        let params = InverseDistanceParams {
            radius1: 1.0,
            radius2: 1.0,
            nodata: -1.0,
            ..Default::default()
        };
        assert_eq!(eval(&corners(), &params, (5.0, 5.0)), -1.0);
    }

    #[test]
    fn test_max_points_keeps_closest() {
        let params = InverseDistanceParams {
            max_points: 1,
            ..Default::default()
        };
        assert_relative_eq!(eval(&corners(), &params, (9.0, 1.0)), 2.0);
    }

    #[test]
    fn test_smoothing_disables_exact_hit() {
        let params = InverseDistanceParams {
            smoothing: 1.0,
            ..Default::default()
        };
        let v = eval(&corners(), &params, (0.0, 0.0));
        assert!(v > 1.0 && v < 4.0);
    }
}
