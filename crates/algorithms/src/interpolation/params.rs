//! Algorithm selection and its `name:key=value` text form

use std::fmt;
use std::str::FromStr;

use surtgrid_core::{Error, Result};
use tracing::warn;

use super::{
    DataMetric, DataMetricParams, InverseDistanceNearestParams, InverseDistanceParams,
    LinearParams, MovingAverageParams, NearestNeighborParams,
};

/// One gridding algorithm together with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum GridAlgorithm {
    /// `invdist`
    InverseDistance(InverseDistanceParams),
    /// `invdistnn`
    InverseDistanceNearest(InverseDistanceNearestParams),
    /// `average`
    MovingAverage(MovingAverageParams),
    /// `nearest`
    NearestNeighbor(NearestNeighborParams),
    /// `minimum`, `maximum`, `range`, `count`, `average_distance`,
    /// `average_distance_pts`
    Metric(DataMetric, DataMetricParams),
    /// `linear`
    Linear(LinearParams),
}

impl Default for GridAlgorithm {
    fn default() -> Self {
        GridAlgorithm::InverseDistance(InverseDistanceParams::default())
    }
}

impl GridAlgorithm {
    /// Name used in the text form
    pub fn name(&self) -> &'static str {
        match self {
            GridAlgorithm::InverseDistance(_) => "invdist",
            GridAlgorithm::InverseDistanceNearest(_) => "invdistnn",
            GridAlgorithm::MovingAverage(_) => "average",
            GridAlgorithm::NearestNeighbor(_) => "nearest",
            GridAlgorithm::Metric(metric, _) => metric.name(),
            GridAlgorithm::Linear(_) => "linear",
        }
    }

    /// Value written to cells the algorithm cannot estimate
    pub fn nodata(&self) -> f64 {
        match self {
            GridAlgorithm::InverseDistance(p) => p.nodata,
            GridAlgorithm::InverseDistanceNearest(p) => p.nodata,
            GridAlgorithm::MovingAverage(p) => p.nodata,
            GridAlgorithm::NearestNeighbor(p) => p.nodata,
            GridAlgorithm::Metric(_, p) => p.nodata,
            GridAlgorithm::Linear(p) => p.nodata,
        }
    }
}

impl fmt::Display for GridAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridAlgorithm::InverseDistance(p) => write!(
                f,
                "invdist:power={}:smoothing={}:radius1={}:radius2={}:angle={}:max_points={}:min_points={}:min_points_per_quadrant={}:max_points_per_quadrant={}:nodata={}",
                p.power,
                p.smoothing,
                p.radius1,
                p.radius2,
                p.angle,
                p.max_points,
                p.min_points,
                p.min_points_per_quadrant,
                p.max_points_per_quadrant,
                p.nodata
            ),
            GridAlgorithm::InverseDistanceNearest(p) => write!(
                f,
                "invdistnn:power={}:smoothing={}:radius={}:max_points={}:min_points={}:min_points_per_quadrant={}:max_points_per_quadrant={}:nodata={}",
                p.power,
                p.smoothing,
                p.radius,
                p.max_points,
                p.min_points,
                p.min_points_per_quadrant,
                p.max_points_per_quadrant,
                p.nodata
            ),
            GridAlgorithm::MovingAverage(p) => write!(
                f,
                "average:radius1={}:radius2={}:angle={}:max_points={}:min_points={}:min_points_per_quadrant={}:max_points_per_quadrant={}:nodata={}",
                p.radius1,
                p.radius2,
                p.angle,
                p.max_points,
                p.min_points,
                p.min_points_per_quadrant,
                p.max_points_per_quadrant,
                p.nodata
            ),
            GridAlgorithm::NearestNeighbor(p) => write!(
                f,
                "nearest:radius1={}:radius2={}:angle={}:nodata={}",
                p.radius1, p.radius2, p.angle, p.nodata
            ),
            GridAlgorithm::Metric(metric, p) => write!(
                f,
                "{}:radius1={}:radius2={}:angle={}:max_points={}:min_points={}:min_points_per_quadrant={}:max_points_per_quadrant={}:nodata={}",
                metric,
                p.radius1,
                p.radius2,
                p.angle,
                p.max_points,
                p.min_points,
                p.min_points_per_quadrant,
                p.max_points_per_quadrant,
                p.nodata
            ),
            GridAlgorithm::Linear(p) => write!(f, "linear:radius={}:nodata={}", p.radius, p.nodata),
        }
    }
}

/// `key=value` tokens of one algorithm string
struct Tokens<'a> {
    algorithm: &'a str,
    pairs: Vec<(String, &'a str, bool)>,
}

impl<'a> Tokens<'a> {
    fn parse(algorithm: &'a str, rest: std::str::Split<'a, char>) -> Result<Self> {
        let mut pairs = Vec::new();
        for token in rest {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let (key, value) = token.split_once('=').ok_or_else(|| {
                Error::Usage(format!(
                    "malformed parameter '{token}' for algorithm '{algorithm}', expected key=value"
                ))
            })?;
            pairs.push((key.trim().to_ascii_lowercase(), value.trim(), false));
        }
        Ok(Self { algorithm, pairs })
    }

    fn raw(&mut self, key: &str) -> Option<&'a str> {
        // The last occurrence wins.
        let mut found = None;
        for (k, v, used) in self.pairs.iter_mut() {
            if k == key {
                *used = true;
                found = Some(*v);
            }
        }
        found
    }

    fn float(&mut self, key: &'static str, default: f64) -> Result<f64> {
        match self.raw(key) {
            None => Ok(default),
            Some(v) => v.parse::<f64>().map_err(|_| Error::InvalidParameter {
                name: key,
                value: v.to_string(),
                reason: format!("not a number in algorithm '{}'", self.algorithm),
            }),
        }
    }

    fn count(&mut self, key: &'static str, default: usize) -> Result<usize> {
        match self.raw(key) {
            None => Ok(default),
            Some(v) => match v.parse::<f64>() {
                Ok(n) if n.is_finite() && n >= 0.0 => Ok(n as usize),
                _ => Err(Error::InvalidParameter {
                    name: key,
                    value: v.to_string(),
                    reason: "expected a non-negative count".into(),
                }),
            },
        }
    }

    /// `radius1`/`radius2`, either falling back to the `radius` shorthand
    fn radii(&mut self) -> Result<(f64, f64)> {
        let both = self.float("radius", 0.0)?;
        Ok((self.float("radius1", both)?, self.float("radius2", both)?))
    }

    /// Warn about keys no algorithm field consumed
    fn finish(self) {
        for (key, value, used) in &self.pairs {
            if !used {
                warn!(
                    algorithm = self.algorithm,
                    key = key.as_str(),
                    value = *value,
                    "Ignoring unknown algorithm parameter"
                );
            }
        }
    }
}

impl FromStr for GridAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        let raw_name = parts.next().unwrap_or_default().trim();
        let name = raw_name.to_ascii_lowercase();
        if name.is_empty() {
            return Err(Error::Usage("empty algorithm name".into()));
        }
        let metric = match name.as_str() {
            "minimum" => Some(DataMetric::Minimum),
            "maximum" => Some(DataMetric::Maximum),
            "range" => Some(DataMetric::Range),
            "count" => Some(DataMetric::Count),
            "average_distance" => Some(DataMetric::AverageDistance),
            "average_distance_pts" => Some(DataMetric::AverageDistancePts),
            _ => None,
        };

        let mut t = Tokens::parse(raw_name, parts)?;
        let algorithm = match (name.as_str(), metric) {
            ("invdist", _) => {
                let (radius1, radius2) = t.radii()?;
                GridAlgorithm::InverseDistance(InverseDistanceParams {
                    power: t.float("power", 2.0)?,
                    smoothing: t.float("smoothing", 0.0)?,
                    radius1,
                    radius2,
                    angle: t.float("angle", 0.0)?,
                    max_points: t.count("max_points", 0)?,
                    min_points: t.count("min_points", 0)?,
                    min_points_per_quadrant: t.count("min_points_per_quadrant", 0)?,
                    max_points_per_quadrant: t.count("max_points_per_quadrant", 0)?,
                    nodata: t.float("nodata", 0.0)?,
                })
            }
            ("invdistnn", _) => {
                let radius = t.float("radius", 1.0)?;
                if radius.is_nan() || radius <= 0.0 {
                    return Err(Error::InvalidParameter {
                        name: "radius",
                        value: radius.to_string(),
                        reason: "invdistnn needs a positive search radius".into(),
                    });
                }
                GridAlgorithm::InverseDistanceNearest(InverseDistanceNearestParams {
                    power: t.float("power", 2.0)?,
                    smoothing: t.float("smoothing", 0.0)?,
                    radius,
                    max_points: t.count("max_points", 12)?,
                    min_points: t.count("min_points", 0)?,
                    min_points_per_quadrant: t.count("min_points_per_quadrant", 0)?,
                    max_points_per_quadrant: t.count("max_points_per_quadrant", 0)?,
                    nodata: t.float("nodata", 0.0)?,
                })
            }
            ("average", _) => {
                let (radius1, radius2) = t.radii()?;
                GridAlgorithm::MovingAverage(MovingAverageParams {
                    radius1,
                    radius2,
                    angle: t.float("angle", 0.0)?,
                    max_points: t.count("max_points", 0)?,
                    min_points: t.count("min_points", 0)?,
                    min_points_per_quadrant: t.count("min_points_per_quadrant", 0)?,
                    max_points_per_quadrant: t.count("max_points_per_quadrant", 0)?,
                    nodata: t.float("nodata", 0.0)?,
                })
            }
            ("nearest", _) => {
                let (radius1, radius2) = t.radii()?;
                GridAlgorithm::NearestNeighbor(NearestNeighborParams {
                    radius1,
                    radius2,
                    angle: t.float("angle", 0.0)?,
                    nodata: t.float("nodata", 0.0)?,
                })
            }
            ("linear", _) => GridAlgorithm::Linear(LinearParams {
                radius: t.float("radius", -1.0)?,
                nodata: t.float("nodata", 0.0)?,
            }),
            (_, Some(metric)) => {
                let (radius1, radius2) = t.radii()?;
                GridAlgorithm::Metric(
                    metric,
                    DataMetricParams {
                        radius1,
                        radius2,
                        angle: t.float("angle", 0.0)?,
                        max_points: t.count("max_points", 0)?,
                        min_points: t.count("min_points", 0)?,
                        min_points_per_quadrant: t.count("min_points_per_quadrant", 0)?,
                        max_points_per_quadrant: t.count("max_points_per_quadrant", 0)?,
                        nodata: t.float("nodata", 0.0)?,
                    },
                )
            }
            (other, None) => {
                return Err(Error::Usage(format!("unsupported gridding method \"{other}\"")));
            }
        };
        t.finish();
        Ok(algorithm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let alg: GridAlgorithm = "invdist".parse().unwrap();
        assert_eq!(alg, GridAlgorithm::default());

        match "invdistnn".parse::<GridAlgorithm>().unwrap() {
            GridAlgorithm::InverseDistanceNearest(p) => {
                assert_eq!(p.radius, 1.0);
                assert_eq!(p.max_points, 12);
                assert_eq!(p.power, 2.0);
            }
            other => panic!("unexpected {other:?}"),
        }

        match "LINEAR".parse::<GridAlgorithm>().unwrap() {
            GridAlgorithm::Linear(p) => assert_eq!(p, LinearParams::default()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parameters() {
        let alg: GridAlgorithm = "invdist:power=3:smoothing=0.5:radius1=10:radius2=5:angle=30:max_points=8:min_points=2:nodata=-9999"
            .parse()
            .unwrap();
        assert_eq!(
            alg,
            GridAlgorithm::InverseDistance(InverseDistanceParams {
                power: 3.0,
                smoothing: 0.5,
                radius1: 10.0,
                radius2: 5.0,
                angle: 30.0,
                max_points: 8,
                min_points: 2,
                min_points_per_quadrant: 0,
                max_points_per_quadrant: 0,
                nodata: -9999.0,
            })
        );
        assert_eq!(alg.nodata(), -9999.0);
    }

    #[test]
    fn test_radius_shorthand() {
        match "average:radius=4:radius2=2".parse::<GridAlgorithm>().unwrap() {
            GridAlgorithm::MovingAverage(p) => {
                assert_eq!(p.radius1, 4.0);
                assert_eq!(p.radius2, 2.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_metrics() {
        for (text, metric) in [
            ("minimum", DataMetric::Minimum),
            ("maximum", DataMetric::Maximum),
            ("range", DataMetric::Range),
            ("count", DataMetric::Count),
            ("average_distance", DataMetric::AverageDistance),
            ("average_distance_pts", DataMetric::AverageDistancePts),
        ] {
            let alg: GridAlgorithm = format!("{text}:min_points=3").parse().unwrap();
            match &alg {
                GridAlgorithm::Metric(m, p) => {
                    assert_eq!(*m, metric);
                    assert_eq!(p.min_points, 3);
                }
                other => panic!("unexpected {other:?}"),
            }
            assert_eq!(alg.name(), text);
        }
    }

    #[test]
    fn test_usage_errors() {
        for text in [
            "",
            "kriging",
            "invdist:power",
            "invdist:power=abc",
            "average:min_points=-1",
            "invdistnn:radius=0",
        ] {
            let err = text.parse::<GridAlgorithm>().unwrap_err();
            assert!(err.is_usage(), "{text}: {err}");
        }
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let alg: GridAlgorithm = "nearest:foo=1:nodata=5".parse().unwrap();
        assert_eq!(alg.nodata(), 5.0);
    }

    #[test]
    fn test_display_parses_back() {
        let caps = "max_points=9:min_points=2:min_points_per_quadrant=1:max_points_per_quadrant=3";
        for text in [
            format!("invdist:power=3:smoothing=0.5:radius1=2:radius2=3:angle=15:{caps}:nodata=-1"),
            format!("invdistnn:power=1.5:radius=4:{caps}:nodata=-2"),
            format!("average:radius1=2:radius2=3:angle=15:{caps}:nodata=-1"),
            format!("range:radius=5:angle=10:{caps}:nodata=7"),
            "nearest:radius1=1:radius2=2:angle=30:nodata=-5".to_string(),
            "linear:radius=0:nodata=-9".to_string(),
        ] {
            let alg: GridAlgorithm = text.parse().unwrap();
            let shown = alg.to_string();
            if text.contains("max_points_per_quadrant") {
                assert!(shown.contains("min_points_per_quadrant=1"), "{shown}");
                assert!(shown.contains("max_points_per_quadrant=3"), "{shown}");
                assert!(shown.contains("max_points=9"), "{shown}");
            }
            let again: GridAlgorithm = shown.parse().unwrap();
            assert_eq!(alg, again, "{text}");
        }
    }
}
