//! Data metrics: statistics of the points in the search ellipse

use std::fmt;

use super::search::{NeighborLimits, Neighborhood, SearchEllipse, SearchScratch, Selection};

/// Which statistic a data metric computes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataMetric {
    Minimum,
    Maximum,
    /// Maximum minus minimum
    Range,
    /// Number of points
    Count,
    /// Mean distance from the node to the points
    AverageDistance,
    /// Mean distance between every pair of points
    AverageDistancePts,
}

impl DataMetric {
    pub fn name(self) -> &'static str {
        match self {
            DataMetric::Minimum => "minimum",
            DataMetric::Maximum => "maximum",
            DataMetric::Range => "range",
            DataMetric::Count => "count",
            DataMetric::AverageDistance => "average_distance",
            DataMetric::AverageDistancePts => "average_distance_pts",
        }
    }
}

impl fmt::Display for DataMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters shared by every data metric
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataMetricParams {
    pub radius1: f64,
    pub radius2: f64,
    pub angle: f64,
    pub max_points: usize,
    pub min_points: usize,
    pub min_points_per_quadrant: usize,
    pub max_points_per_quadrant: usize,
    pub nodata: f64,
}

impl DataMetricParams {
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

/// Evaluate `metric` at (qx, qy).
///
/// `Count` always reports how many points were selected, even zero. The
/// other metrics give `nodata` when no point (for pair distances, fewer than
/// two), fewer than `min_points` or too few per quadrant were found.
pub(crate) fn data_metric(
    metric: DataMetric,
    hood: &Neighborhood<'_>,
    nodata: f64,
    qx: f64,
    qy: f64,
    scratch: &mut SearchScratch,
) -> f64 {
    let selection = hood.select(qx, qy, None, scratch);
    let candidates = &scratch.candidates;
    let n = candidates.len();

    if metric == DataMetric::Count {
        return n as f64;
    }
    if selection == Selection::QuadrantShortfall || n == 0 || n < hood.limits.min_points {
        return nodata;
    }

    let values = candidates.iter().map(|c| hood.points.value(c.index));
    match metric {
        DataMetric::Minimum => values.fold(f64::INFINITY, f64::min),
        DataMetric::Maximum => values.fold(f64::NEG_INFINITY, f64::max),
        DataMetric::Range => {
            let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
            hi - lo
        }
        DataMetric::AverageDistance => {
            candidates.iter().map(|c| c.dist_sq.sqrt()).sum::<f64>() / n as f64
        }
        DataMetric::AverageDistancePts => {
            if n < 2 {
                return nodata;
            }
            let mut total = 0.0;
            for (k, a) in candidates.iter().enumerate() {
                for b in &candidates[k + 1..] {
                    let dx = hood.points.x(a.index) - hood.points.x(b.index);
                    let dy = hood.points.y(a.index) - hood.points.y(b.index);
                    total += (dx * dx + dy * dy).sqrt();
                }
            }
            let pairs = n * (n - 1) / 2;
            total / pairs as f64
        }
        DataMetric::Count => n as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::{PointSet, SamplePoint};
    use approx::assert_relative_eq;

    fn triangle() -> PointSet {
        PointSet::from_samples(&[
            SamplePoint::new(0.0, 0.0, 5.0),
            SamplePoint::new(3.0, 0.0, -1.0),
            SamplePoint::new(0.0, 4.0, 9.0),
        ])
    }

    fn eval(metric: DataMetric, params: &DataMetricParams, q: (f64, f64)) -> f64 {
        let points = triangle();
        let hood = Neighborhood {
            points: &points,
            index: None,
            ellipse: params.ellipse(),
            limits: params.limits(),
            initial_radius: 1.0,
        };
        data_metric(metric, &hood, params.nodata, q.0, q.1, &mut SearchScratch::default())
    }

    #[test]
    fn test_value_statistics() {
        let p = DataMetricParams::default();
        assert_eq!(eval(DataMetric::Minimum, &p, (1.0, 1.0)), -1.0);
        assert_eq!(eval(DataMetric::Maximum, &p, (1.0, 1.0)), 9.0);
        assert_eq!(eval(DataMetric::Range, &p, (1.0, 1.0)), 10.0);
        assert_eq!(eval(DataMetric::Count, &p, (1.0, 1.0)), 3.0);
    }

    #[test]
    fn test_distances() {
        let p = DataMetricParams::default();
        assert_relative_eq!(eval(DataMetric::AverageDistance, &p, (0.0, 0.0)), 7.0 / 3.0);
        assert_relative_eq!(eval(DataMetric::AverageDistancePts, &p, (0.0, 0.0)), 4.0);
    }

    #[test]
    fn test_count_never_nodata() {
        let p = DataMetricParams {
            radius1: 1.0,
            radius2: 1.0,
            min_points: 5,
            nodata: -9.0,
            ..Default::default()
        };
        assert_eq!(eval(DataMetric::Count, &p, (0.0, 0.0)), 1.0);
        assert_eq!(eval(DataMetric::Count, &p, (50.0, 50.0)), 0.0);
        assert_eq!(eval(DataMetric::Minimum, &p, (0.0, 0.0)), -9.0);
    }

    #[test]
    fn test_pair_distance_needs_two_points() {
        let p = DataMetricParams {
            radius1: 1.0,
            radius2: 1.0,
            nodata: -9.0,
            ..Default::default()
        };
        assert_eq!(eval(DataMetric::AverageDistancePts, &p, (0.0, 0.0)), -9.0);
        assert_eq!(eval(DataMetric::Maximum, &p, (20.0, 0.0)), -9.0);
    }
}
