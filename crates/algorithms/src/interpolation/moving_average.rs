//! Moving average: arithmetic mean of the points in the search ellipse

use super::search::{NeighborLimits, Neighborhood, SearchEllipse, SearchScratch, Selection};

/// Parameters for the moving average (`average`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovingAverageParams {
    pub radius1: f64,
    pub radius2: f64,
    pub angle: f64,
    pub max_points: usize,
    pub min_points: usize,
    pub min_points_per_quadrant: usize,
    pub max_points_per_quadrant: usize,
    pub nodata: f64,
}

impl MovingAverageParams {
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

pub(crate) fn moving_average(
    hood: &Neighborhood<'_>,
    nodata: f64,
    qx: f64,
    qy: f64,
    scratch: &mut SearchScratch,
) -> f64 {
    if hood.select(qx, qy, None, scratch) == Selection::QuadrantShortfall {
        return nodata;
    }
    let candidates = &scratch.candidates;
    if candidates.is_empty() || candidates.len() < hood.limits.min_points {
        return nodata;
    }
    let sum: f64 = candidates.iter().map(|c| hood.points.value(c.index)).sum();
    sum / candidates.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::{PointSet, SamplePoint};
    use approx::assert_relative_eq;

    fn line() -> PointSet {
        PointSet::from_samples(&[
            SamplePoint::new(0.0, 0.0, 2.0),
            SamplePoint::new(1.0, 0.0, 4.0),
            SamplePoint::new(2.0, 0.0, 6.0),
            SamplePoint::new(8.0, 0.0, 100.0),
        ])
    }

    fn eval(params: &MovingAverageParams, q: (f64, f64)) -> f64 {
        let points = line();
        let hood = Neighborhood {
            points: &points,
            index: None,
            ellipse: params.ellipse(),
            limits: params.limits(),
            initial_radius: 1.0,
        };
        moving_average(&hood, params.nodata, q.0, q.1, &mut SearchScratch::default())
    }

    #[test]
    fn test_mean_within_radius() {
        let params = MovingAverageParams {
            radius1: 1.5,
            radius2: 1.5,
            ..Default::default()
        };
        assert_relative_eq!(eval(&params, (1.0, 0.0)), 4.0);
    }

    #[test]
    fn test_min_points_gives_nodata() {
        for k in 1..=5 {
            let params = MovingAverageParams {
                radius1: 1.5,
                radius2: 1.5,
                min_points: k,
                nodata: -1.0,
                ..Default::default()
            };
            let v = eval(&params, (1.0, 0.0));
            if k > 3 {
                assert_eq!(v, -1.0);
            } else {
                assert_relative_eq!(v, 4.0);
            }
        }
    }

    #[test]
    fn test_unbounded_uses_all_points() {
        let v = eval(&MovingAverageParams::default(), (50.0, 50.0));
        assert_relative_eq!(v, 28.0);
    }

    #[test]
    fn test_no_points_is_nodata() {
        let params = MovingAverageParams {
            radius1: 0.5,
            radius2: 0.5,
            nodata: -7.0,
            ..Default::default()
        };
        assert_eq!(eval(&params, (5.0, 5.0)), -7.0);
    }
}
