//! Layer-to-points adapter: pull sample points out of a vector layer

use geo::Intersects;
use geo_types::{Geometry, Point};
use surtgrid_core::vector::VectorLayer;
use surtgrid_core::{Error, Result};
use tracing::debug;

use crate::interpolation::PointSet;

/// How point values are obtained from features
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    /// Attribute holding the value; the geometry Z is used when `None`
    pub burn_field: Option<String>,
    /// Added to every raw value
    pub increase: f64,
    /// Applied after `increase`
    pub multiply: f64,
    /// Points strictly outside this geometry are dropped
    pub clip: Option<Geometry<f64>>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            burn_field: None,
            increase: 0.0,
            multiply: 1.0,
            clip: None,
        }
    }
}

/// Collect the points of `layer` that pass its spatial filter.
///
/// Each stored value is `(raw + increase) * multiply`. Without a burn field
/// the raw value is the point's Z and points with a NaN Z are dropped. With
/// a burn field, features whose attribute is null or missing are skipped.
/// An unknown burn field fails with [`Error::Layer`].
pub fn extract_points(layer: &VectorLayer, options: &ExtractOptions) -> Result<PointSet> {
    let burn_index = match &options.burn_field {
        Some(name) => Some(layer.field_index(name).ok_or_else(|| Error::Layer {
            layer: layer.name.clone(),
            reason: format!("failed to find field '{name}'"),
        })?),
        None => None,
    };

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut zs = Vec::new();
    let mut clipped = 0usize;

    for feature in layer.features() {
        let burn = match burn_index {
            Some(i) => match feature.attribute(i).and_then(|a| a.as_f64()) {
                Some(v) => Some(v),
                None => continue,
            },
            None => None,
        };

        for p in feature.points() {
            if let Some(clip) = &options.clip {
                if !clip.intersects(&Point::new(p.x, p.y)) {
                    clipped += 1;
                    continue;
                }
            }
            let raw = match burn {
                Some(v) => v,
                None if p.z.is_nan() => continue,
                None => p.z,
            };
            xs.push(p.x);
            ys.push(p.y);
            zs.push((raw + options.increase) * options.multiply);
        }
    }

    debug!(layer = layer.name.as_str(), points = xs.len(), clipped, "Extracted points");
    PointSet::new(xs, ys, zs)
}
