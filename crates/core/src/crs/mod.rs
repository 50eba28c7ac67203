//! Coordinate Reference System handling
//!
//! Only the systems a Landsat composite touches are modelled: WGS84
//! geographic coordinates (clip boxes), UTM (source bands) and Web
//! Mercator (the working projection every composite is written in).

mod projection;

pub use projection::{transform_bounds, transform_point};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG code of the working projection (Web Mercator)
pub const WORKING_EPSG: u32 = 3857;

/// Coordinate Reference System, identified by EPSG code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CRS {
    epsg: u32,
}

/// Projection family behind an EPSG code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsKind {
    /// Longitude/latitude in degrees on WGS84
    Geographic,
    /// Spherical Web Mercator in metres
    WebMercator,
    /// Universal Transverse Mercator zone on WGS84
    Utm { zone: u32, north: bool },
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: code }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// WGS84 / UTM zone (EPSG:326xx north, 327xx south)
    pub fn utm(zone: u32, north: bool) -> Self {
        let base = if north { 32600 } else { 32700 };
        Self::from_epsg(base + zone)
    }

    /// EPSG code
    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Classify the EPSG code, failing for anything this crate cannot project
    pub fn kind(&self) -> Result<CrsKind> {
        match self.epsg {
            4326 => Ok(CrsKind::Geographic),
            3857 | 900913 => Ok(CrsKind::WebMercator),
            code @ 32601..=32660 => Ok(CrsKind::Utm {
                zone: code - 32600,
                north: true,
            }),
            code @ 32701..=32760 => Ok(CrsKind::Utm {
                zone: code - 32700,
                north: false,
            }),
            code => Err(Error::UnsupportedCrs(code)),
        }
    }

    /// Whether coordinates are angular (degrees)
    pub fn is_geographic(&self) -> bool {
        matches!(self.kind(), Ok(CrsKind::Geographic))
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        match (self.kind(), other.kind()) {
            (Ok(a), Ok(b)) => a == b,
            _ => self.epsg == other.epsg,
        }
    }

    /// String identifier for this CRS
    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::web_mercator()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(4326);
        assert_eq!(crs.epsg(), 4326);
        assert_eq!(crs.identifier(), "EPSG:4326");
        assert!(crs.is_geographic());
    }

    #[test]
    fn test_utm_kinds() {
        assert_eq!(
            CRS::from_epsg(32616).kind().unwrap(),
            CrsKind::Utm { zone: 16, north: true }
        );
        assert_eq!(
            CRS::from_epsg(32721).kind().unwrap(),
            CrsKind::Utm { zone: 21, north: false }
        );
        assert_eq!(CRS::utm(30, true).epsg(), 32630);
        assert!(CRS::from_epsg(32600).kind().is_err());
        assert!(CRS::from_epsg(32661).kind().is_err());
    }

    #[test]
    fn test_crs_equivalence() {
        assert!(CRS::from_epsg(900913).is_equivalent(&CRS::web_mercator()));
        assert!(!CRS::wgs84().is_equivalent(&CRS::web_mercator()));
    }
}
