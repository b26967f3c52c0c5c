//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation.
///
/// GeoTIFF stores a CRS either as an EPSG code in the GeoKey directory or as a
/// free-form citation string (often WKT). Both are kept so a raster can be
/// re-encoded without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// EPSG code if known
    epsg: Option<u32>,
    /// WKT or citation text if available
    wkt: Option<String>,
    /// Whether the EPSG code names a geographic (lat/lon) system
    geographic: bool,
}

impl CRS {
    /// Create a CRS from an EPSG code.
    ///
    /// Well-known geographic codes such as 4326 come out geographic; any
    /// other code is taken as projected.
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
            geographic: is_geographic_epsg(code),
        }
    }

    /// Create a geographic CRS from an EPSG code
    pub fn geographic_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
            geographic: true,
        }
    }

    /// Create a CRS from a WKT (or citation) string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
            geographic: false,
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::geographic_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether this is a geographic (angular) coordinate system
    pub fn is_geographic(&self) -> bool {
        self.geographic
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        // Textual comparison is imperfect but good enough for a warning
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a.trim() == b.trim();
        }

        false
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

/// Geographic 2D and 3D codes from the EPSG 4xxx block.
///
/// Projected and geocentric systems numbered inside the ranges are excluded.
fn is_geographic_epsg(code: u32) -> bool {
    match code {
        4217 | 4328 | 4647 | 4726 => false,
        4120..=4329 | 4600..=4765 => true,
        4019 | 4030 | 4047 | 4937 | 4959 | 4979 | 4988 | 4989 => true,
        _ => false,
    }
}
