//! GeoJSON layer reader

use std::fs;
use std::path::Path;
use std::str::FromStr;

use geojson::{GeoJson, JsonObject, JsonValue, Value};

use super::{AttributeValue, Feature, VectorLayer};
use crate::crs::CRS;
use crate::error::{Error, Result};

/// Read a GeoJSON file as one layer named after the file stem.
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<VectorLayer> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("layer");
    read_geojson_str(&text, stem)
}

/// Parse GeoJSON text (a FeatureCollection, a Feature or a bare Geometry).
///
/// The field list is the union of property names in order of first
/// appearance. A legacy `crs` member naming an EPSG code becomes the layer
/// CRS and a top level `name` member overrides `default_name`.
pub fn read_geojson_str(text: &str, default_name: &str) -> Result<VectorLayer> {
    let parsed = GeoJson::from_str(text).map_err(|e| Error::Vector(e.to_string()))?;

    let (raw_features, foreign) = match parsed {
        GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
        GeoJson::Feature(f) => (vec![f], None),
        GeoJson::Geometry(g) => (
            vec![geojson::Feature {
                bbox: None,
                geometry: Some(g),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            None,
        ),
    };

    let name = foreign
        .as_ref()
        .and_then(|m| m.get("name"))
        .and_then(JsonValue::as_str)
        .unwrap_or(default_name);

    let mut fields: Vec<String> = Vec::new();
    for f in &raw_features {
        if let Some(props) = &f.properties {
            for key in props.keys() {
                if !fields.iter().any(|k| k == key) {
                    fields.push(key.clone());
                }
            }
        }
    }

    let mut layer = VectorLayer::new(name, fields);
    layer.crs = foreign.as_ref().and_then(legacy_crs);

    for raw in raw_features {
        let attributes = layer
            .fields
            .iter()
            .map(|key| {
                raw.properties
                    .as_ref()
                    .and_then(|p| p.get(key))
                    .map_or(AttributeValue::Null, attribute_from_json)
            })
            .collect();

        let feature = match raw.geometry {
            Some(g) => {
                let mut z = Vec::new();
                collect_z(&g.value, &mut z);
                let geometry = geo_types::Geometry::<f64>::try_from(g.value)
                    .map_err(|e| Error::Vector(e.to_string()))?;
                Feature::new(geometry).with_z(z)
            }
            None => Feature {
                geometry: None,
                z: Vec::new(),
                attributes: Vec::new(),
            },
        };
        layer.push(feature.with_attributes(attributes));
    }

    tracing::debug!(
        "Read layer '{}': {} features, {} fields",
        layer.name,
        layer.features.len(),
        layer.fields.len()
    );
    Ok(layer)
}

/// Z of point members in the same order `Feature::points` visits them.
fn collect_z(value: &Value, out: &mut Vec<f64>) {
    match value {
        Value::Point(pos) => out.push(pos.get(2).copied().unwrap_or(0.0)),
        Value::MultiPoint(positions) => {
            out.extend(positions.iter().map(|p| p.get(2).copied().unwrap_or(0.0)))
        }
        Value::GeometryCollection(members) => {
            for g in members {
                collect_z(&g.value, out);
            }
        }
        _ => {}
    }
}

fn attribute_from_json(value: &JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => AttributeValue::String(s.clone()),
        other => AttributeValue::String(other.to_string()),
    }
}

fn legacy_crs(members: &JsonObject) -> Option<CRS> {
    let name = members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;
    match CRS::from_str(name) {
        Ok(crs) => Some(crs),
        Err(e) => {
            tracing::warn!("Ignoring unrecognised layer CRS '{}': {}", name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "name": "wells",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::32719" } },
        "features": [
            { "type": "Feature", "properties": { "depth": 12.5, "id": 1 },
              "geometry": { "type": "Point", "coordinates": [1.0, 2.0, 30.0] } },
            { "type": "Feature", "properties": { "depth": null, "owner": "x" },
              "geometry": { "type": "MultiPoint", "coordinates": [[3.0, 4.0], [5.0, 6.0, -1.0]] } },
            { "type": "Feature", "properties": {}, "geometry": null }
        ]
    }"#;

    #[test]
    fn test_read_collection() {
        let layer = read_geojson_str(SAMPLE, "fallback").unwrap();
        assert_eq!(layer.name, "wells");
        assert_eq!(layer.fields, vec!["depth", "id", "owner"]);
        assert_eq!(layer.crs.as_ref().and_then(CRS::epsg), Some(32719));
        assert_eq!(layer.features.len(), 3);

        let first = &layer.features[0];
        assert_eq!(first.points()[0].z, 30.0);
        assert_eq!(first.attribute(0), Some(&AttributeValue::Float(12.5)));
        assert_eq!(first.attribute(2), Some(&AttributeValue::Null));

        let second = layer.features[1].points();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].z, 0.0);
        assert_eq!(second[1].z, -1.0);
        assert_eq!(layer.features[1].attribute(0), Some(&AttributeValue::Null));

        assert!(layer.features[2].geometry.is_none());
    }

    #[test]
    fn test_bare_geometry() {
        let layer = read_geojson_str(
            r#"{"type": "Point", "coordinates": [7.0, 8.0, 9.0]}"#,
            "single",
        )
        .unwrap();
        assert_eq!(layer.name, "single");
        assert!(layer.crs.is_none());
        assert_eq!(layer.features[0].points()[0].z, 9.0);
    }

    #[test]
    fn test_malformed_input() {
        let err = read_geojson_str("{\"type\": \"Nope\"}", "x").unwrap_err();
        assert!(matches!(err, Error::Vector(_)));
    }
}
