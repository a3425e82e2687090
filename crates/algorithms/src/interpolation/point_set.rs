//! Immutable scattered sample points

use geo_types::{coord, Rect};
use surtgrid_core::{Error, Result};

use super::SamplePoint;

/// Sample coordinates and values stored as three parallel arrays.
///
/// Index `i` refers to the same sample in all three arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl PointSet {
    /// Build from parallel arrays of equal length
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() || x.len() != z.len() {
            return Err(Error::InvalidParameter {
                name: "points",
                value: format!("{}/{}/{}", x.len(), y.len(), z.len()),
                reason: "X, Y and value arrays must have the same length".into(),
            });
        }
        Ok(Self { x, y, z })
    }

    pub fn from_samples(samples: &[SamplePoint]) -> Self {
        Self {
            x: samples.iter().map(|p| p.x).collect(),
            y: samples.iter().map(|p| p.y).collect(),
            z: samples.iter().map(|p| p.value).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    #[inline]
    pub fn x(&self, i: usize) -> f64 {
        self.x[i]
    }

    #[inline]
    pub fn y(&self, i: usize) -> f64 {
        self.y[i]
    }

    #[inline]
    pub fn value(&self, i: usize) -> f64 {
        self.z[i]
    }

    pub fn xs(&self) -> &[f64] {
        &self.x
    }

    pub fn ys(&self) -> &[f64] {
        &self.y
    }

    pub fn values(&self) -> &[f64] {
        &self.z
    }

    /// Squared distance from point `i` to (qx, qy)
    #[inline]
    pub fn dist_sq(&self, i: usize, qx: f64, qy: f64) -> f64 {
        let dx = self.x[i] - qx;
        let dy = self.y[i] - qy;
        dx * dx + dy * dy
    }

    /// Bounding rectangle of all coordinates, `None` when empty
    pub fn bounds(&self) -> Option<Rect<f64>> {
        if self.is_empty() {
            return None;
        }
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (&x, &y) in self.x.iter().zip(&self.y) {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y }))
    }
}
