//! `_MTL.txt` sidecar parsing
//!
//! The sidecar is a list of `KEY = value` lines nested in `GROUP` blocks.
//! Only a handful of keys matter for compositing; everything else is
//! skipped. A missing file or key is not an error: calibration falls back
//! to the identity and cloud cover to `None`.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::Result;

/// Linear reflectance calibration for one band: `value * mult + add`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub mult: f64,
    pub add: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self { mult: 1.0, add: 0.0 }
    }
}

impl Calibration {
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        value * self.mult + self.add
    }

    pub fn is_identity(&self) -> bool {
        self.mult == 1.0 && self.add == 0.0
    }
}

/// Acquisition metadata used by the composite stages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneMetadata {
    /// Scene-wide cloud cover percentage
    pub cloud_cover: Option<f64>,
    /// Acquisition date as written in the sidecar
    pub date_acquired: Option<String>,
    calibration: BTreeMap<u8, Calibration>,
}

impl SceneMetadata {
    /// Read a sidecar file. A file that does not exist yields empty metadata.
    pub fn read(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "metadata file missing, using neutral values");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parse sidecar text
    pub fn parse(text: &str) -> Self {
        let mut meta = Self::default();
        let mut mults = BTreeMap::new();
        let mut adds = BTreeMap::new();

        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().trim_matches('"');

            if key == "CLOUD_COVER" {
                meta.cloud_cover = parse_number(key, value);
            } else if key == "DATE_ACQUIRED" {
                meta.date_acquired = Some(value.to_string());
            } else if let Some(band) = band_suffix(key, "REFLECTANCE_MULT_BAND_") {
                if let Some(v) = parse_number(key, value) {
                    mults.insert(band, v);
                }
            } else if let Some(band) = band_suffix(key, "REFLECTANCE_ADD_BAND_") {
                if let Some(v) = parse_number(key, value) {
                    adds.insert(band, v);
                }
            }
        }

        for (band, mult) in mults {
            let add = adds.remove(&band).unwrap_or(0.0);
            meta.calibration.insert(band, Calibration { mult, add });
        }
        for (band, add) in adds {
            meta.calibration.insert(band, Calibration { mult: 1.0, add });
        }

        debug!(
            cloud_cover = ?meta.cloud_cover,
            calibrated_bands = meta.calibration.len(),
            "parsed scene metadata"
        );
        meta
    }

    /// Calibration for a band; identity when the sidecar has none
    pub fn calibration(&self, band: u8) -> Calibration {
        self.calibration.get(&band).copied().unwrap_or_default()
    }

    /// Whether the sidecar carried coefficients for `band`
    pub fn has_calibration(&self, band: u8) -> bool {
        self.calibration.contains_key(&band)
    }
}

fn band_suffix(key: &str, prefix: &str) -> Option<u8> {
    key.strip_prefix(prefix)?.parse().ok()
}

fn parse_number(key: &str, value: &str) -> Option<f64> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            warn!(key, value, "ignoring non-numeric metadata value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const MTL: &str = r#"GROUP = L1_METADATA_FILE
  GROUP = PRODUCT_METADATA
    DATE_ACQUIRED = 2015-02-15
  END_GROUP = PRODUCT_METADATA
  GROUP = IMAGE_ATTRIBUTES
    CLOUD_COVER = 28.41
    CLOUD_COVER_LAND = 30.00
  END_GROUP = IMAGE_ATTRIBUTES
  GROUP = RADIOMETRIC_RESCALING
    REFLECTANCE_MULT_BAND_4 = 2.0000E-05
    REFLECTANCE_MULT_BAND_5 = 2.0000E-05
    REFLECTANCE_ADD_BAND_4 = -0.100000
    REFLECTANCE_ADD_BAND_5 = -0.100000
  END_GROUP = RADIOMETRIC_RESCALING
END_GROUP = L1_METADATA_FILE
END
"#;

    #[test]
    fn test_parse_keys() {
        let meta = SceneMetadata::parse(MTL);
        assert_relative_eq!(meta.cloud_cover.unwrap(), 28.41);
        assert_eq!(meta.date_acquired.as_deref(), Some("2015-02-15"));

        let cal = meta.calibration(4);
        assert_relative_eq!(cal.mult, 2.0e-5);
        assert_relative_eq!(cal.add, -0.1);
        assert_relative_eq!(cal.apply(10_000.0), 0.1, epsilon = 1e-12);
        assert!(meta.has_calibration(5));
    }

    #[test]
    fn test_missing_keys_are_neutral() {
        let meta = SceneMetadata::parse("GROUP = L1_METADATA_FILE\nEND\n");
        assert!(meta.cloud_cover.is_none());
        assert!(meta.calibration(3).is_identity());
        assert!(!meta.has_calibration(3));
    }

    #[test]
    fn test_bad_number_is_skipped() {
        let meta = SceneMetadata::parse("CLOUD_COVER = lots\n");
        assert!(meta.cloud_cover.is_none());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let meta = SceneMetadata::read(&dir.path().join("nope_MTL.txt")).unwrap();
        assert_eq!(meta, SceneMetadata::default());
    }
}
