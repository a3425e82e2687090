//! Vector layers: features with point geometry and an attribute schema
//!
//! Only what gridding needs is modelled. Geometries are `geo-types` values;
//! Z ordinates of point members travel next to them because `geo-types` is
//! strictly 2D.

mod reader;

pub use reader::{read_geojson, read_geojson_str};

use geo::{BoundingRect, Intersects};
use geo_types::{Geometry, Rect};
use serde::{Deserialize, Serialize};

use crate::crs::CRS;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Numeric reading of the value; `None` when the field is unset.
    ///
    /// Text that does not parse as a number reads as 0, the way a C `atof`
    /// would.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Null => None,
            AttributeValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::String(s) => Some(s.trim().parse().unwrap_or(0.0)),
        }
    }
}

/// A single point taken from a feature geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointZ {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Z of every point member, in the order [`Feature::points`] visits them
    pub z: Vec<f64>,
    /// Attribute values indexed like the layer's field list
    pub attributes: Vec<AttributeValue>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            z: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn with_z(mut self, z: Vec<f64>) -> Self {
        self.z = z;
        self
    }

    pub fn with_attributes(mut self, attributes: Vec<AttributeValue>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Get an attribute by field index
    pub fn attribute(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }

    /// Points of the geometry, flattening multi-points and collections.
    ///
    /// Non-point members are skipped. Missing Z reads as 0.
    pub fn points(&self) -> Vec<PointZ> {
        let mut out = Vec::new();
        if let Some(geometry) = &self.geometry {
            collect_points(geometry, &mut out);
        }
        for (i, p) in out.iter_mut().enumerate() {
            p.z = self.z.get(i).copied().unwrap_or(0.0);
        }
        out
    }
}

fn collect_points(geometry: &Geometry<f64>, out: &mut Vec<PointZ>) {
    match geometry {
        Geometry::Point(p) => out.push(PointZ {
            x: p.x(),
            y: p.y(),
            z: 0.0,
        }),
        Geometry::MultiPoint(mp) => out.extend(mp.iter().map(|p| PointZ {
            x: p.x(),
            y: p.y(),
            z: 0.0,
        })),
        Geometry::GeometryCollection(gc) => {
            for g in gc.iter() {
                collect_points(g, out);
            }
        }
        _ => {}
    }
}

/// A named collection of features sharing one attribute schema.
#[derive(Debug, Clone, Default)]
pub struct VectorLayer {
    pub name: String,
    pub fields: Vec<String>,
    pub features: Vec<Feature>,
    pub crs: Option<CRS>,
    spatial_filter: Option<Rect<f64>>,
}

impl VectorLayer {
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
            ..Default::default()
        }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Index of a field by name (case-insensitive)
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.eq_ignore_ascii_case(name))
    }

    /// Restrict [`VectorLayer::features`] to geometries intersecting `rect`
    pub fn set_spatial_filter(&mut self, rect: Option<Rect<f64>>) {
        self.spatial_filter = rect;
    }

    pub fn spatial_filter(&self) -> Option<Rect<f64>> {
        self.spatial_filter
    }

    /// Features passing the spatial filter, if any
    pub fn features(&self) -> impl Iterator<Item = &Feature> + '_ {
        let filter = self.spatial_filter;
        self.features.iter().filter(move |f| match (&filter, &f.geometry) {
            (None, _) => true,
            (Some(rect), Some(g)) => g.intersects(rect),
            (Some(_), None) => false,
        })
    }

    /// Bounding rectangle of all filtered feature geometries
    pub fn extent(&self) -> Option<Rect<f64>> {
        self.features()
            .filter_map(|f| f.geometry.as_ref()?.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                    (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
                )
            })
    }
}
