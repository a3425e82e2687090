//! Coordinate Reference System handling
//!
//! Gridding never reprojects. A CRS is only carried from the input layers
//! (or a user override) to the output raster's georeferencing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation, when given as such
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether the EPSG code falls in the geographic 2D range.
    ///
    /// This is a heuristic on the code only; it decides the GeoTIFF model
    /// type key.
    pub fn is_geographic(&self) -> bool {
        matches!(self.epsg, Some(4000..=4999))
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            let head: String = wkt.chars().take(50).collect();
            return format!("WKT:{}", head);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl FromStr for CRS {
    type Err = Error;

    /// Accepts `EPSG:n`, OGC URNs (`urn:ogc:def:crs:EPSG::n`,
    /// `urn:ogc:def:crs:OGC:1.3:CRS84`) and raw WKT.
    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let upper = text.to_ascii_uppercase();

        if upper.ends_with("CRS84") {
            return Ok(CRS::wgs84());
        }
        if let Some(rest) = upper.strip_prefix("EPSG:") {
            return parse_code(rest, text);
        }
        if upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            let code = upper.rsplit(':').next().unwrap_or_default();
            return parse_code(code, text);
        }
        if upper.contains('[') {
            return Ok(CRS::from_wkt(text));
        }
        Err(Error::InvalidParameter {
            name: "srs",
            value: text.to_string(),
            reason: "expected EPSG:<code>, an OGC URN or WKT".into(),
        })
    }
}

fn parse_code(code: &str, original: &str) -> Result<CRS> {
    code.trim()
        .parse::<u32>()
        .map(CRS::from_epsg)
        .map_err(|_| Error::InvalidParameter {
            name: "srs",
            value: original.to_string(),
            reason: "EPSG code is not a number".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(4326);
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs.identifier(), "EPSG:4326");
        assert!(crs.is_geographic());
        assert!(!CRS::from_epsg(32719).is_geographic());
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!("EPSG:32719".parse::<CRS>().unwrap().epsg(), Some(32719));
        assert_eq!("epsg:3857".parse::<CRS>().unwrap().epsg(), Some(3857));
        assert_eq!(
            "urn:ogc:def:crs:EPSG::2193".parse::<CRS>().unwrap().epsg(),
            Some(2193)
        );
        assert_eq!(
            "urn:ogc:def:crs:OGC:1.3:CRS84".parse::<CRS>().unwrap(),
            CRS::wgs84()
        );
        let wkt = "GEOGCS[\"WGS 84\"]".parse::<CRS>().unwrap();
        assert_eq!(wkt.wkt(), Some("GEOGCS[\"WGS 84\"]"));
        assert!("EPSG:abc".parse::<CRS>().is_err());
        assert!("mercator".parse::<CRS>().is_err());
    }
}
