//! Cloud and snow coverage from the QA band
//!
//! QA bits used here (Landsat 8 pre-collection layout):
//!
//! ```text
//! bit  0       designated fill
//! bits 10-11   snow/ice confidence   (11 = high)
//! bits 12-13   cirrus confidence     (10 = medium, 11 = high)
//! bits 14-15   cloud confidence      (10 = medium, 11 = high)
//! ```

use landsat_core::{Raster, SceneMetadata};
use rayon::prelude::*;
use tracing::{info, warn};

pub const CLOUD_HIGH: u16 = 0b11 << 14;
pub const SNOW_HIGH: u16 = 0b11 << 10;
pub const FILL: u16 = 0b1;

const CLOUD_MEDIUM_OR_HIGH: u16 = 0b10 << 14;
const CIRRUS_MEDIUM_OR_HIGH: u16 = 0b10 << 12;

/// High-confidence cloud or snow/ice
#[inline]
pub fn cloud_or_snow(qa: u16) -> bool {
    qa & CLOUD_HIGH == CLOUD_HIGH || qa & SNOW_HIGH == SNOW_HIGH
}

/// Medium or high confidence cloud or cirrus; used to mask NDVI
#[inline]
pub fn cloud_or_cirrus(qa: u16) -> bool {
    qa & CLOUD_MEDIUM_OR_HIGH != 0 || qa & CIRRUS_MEDIUM_OR_HIGH != 0
}

#[inline]
pub fn is_fill(qa: u16) -> bool {
    qa & FILL == FILL
}

/// Percentage (0 to 100) of non-fill pixels flagged high-confidence cloud
/// or snow.
///
/// A band made only of fill has nothing to measure; it reports 0.
pub fn coverage_fraction(qa: &Raster<u16>) -> f64 {
    let (rows, cols) = qa.shape();

    let (flagged, fill) = (0..rows)
        .into_par_iter()
        .map(|row| {
            let mut flagged = 0usize;
            let mut fill = 0usize;
            for col in 0..cols {
                let v = unsafe { qa.get_unchecked(row, col) };
                if cloud_or_snow(v) {
                    flagged += 1;
                }
                if is_fill(v) {
                    fill += 1;
                }
            }
            (flagged, fill)
        })
        .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

    let valid = qa.len() - fill;
    if valid == 0 {
        warn!("QA band has no valid pixels, assuming no cloud or snow");
        return 0.0;
    }

    flagged as f64 / valid as f64 * 100.0
}

/// Where the coverage figure for a run came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageSource {
    QaBand,
    Metadata,
    Assumed,
}

/// Coverage for a scene: the QA band when there is one, otherwise the
/// metadata `CLOUD_COVER`, otherwise 0.
pub fn scene_coverage(qa: Option<&Raster<u16>>, metadata: &SceneMetadata) -> (f64, CoverageSource) {
    let (coverage, source) = match (qa, metadata.cloud_cover) {
        (Some(qa), _) => (coverage_fraction(qa), CoverageSource::QaBand),
        (None, Some(cover)) => (cover.clamp(0.0, 100.0), CoverageSource::Metadata),
        (None, None) => (0.0, CoverageSource::Assumed),
    };
    info!(coverage, source = ?source, "cloud/snow coverage");
    (coverage, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flags() {
        assert!(cloud_or_snow(0b1100_0000_0000_0000));
        assert!(cloud_or_snow(0b0000_1100_0000_0000));
        assert!(!cloud_or_snow(0b1000_0000_0000_0000));
        assert!(!cloud_or_snow(0b0000_0100_0000_0000));

        assert!(cloud_or_cirrus(0b1000_0000_0000_0000));
        assert!(cloud_or_cirrus(0b0011_0000_0000_0000));
        assert!(cloud_or_cirrus(0b0010_0000_0000_0000));
        assert!(!cloud_or_cirrus(0b0101_0000_0000_0000));
    }

    #[test]
    fn test_coverage_excludes_fill() {
        // 10 pixels: 2 fill, 2 cloud, 2 snow, 4 clear
        let values = vec![
            1, 1, CLOUD_HIGH, CLOUD_HIGH, SNOW_HIGH, SNOW_HIGH, 0x5000, 0x5000, 0x5000, 0x5000,
        ];
        let qa = Raster::from_vec(values, 2, 5).unwrap();
        assert_relative_eq!(coverage_fraction(&qa), 50.0);
    }

    #[test]
    fn test_all_fill_is_zero() {
        let qa = Raster::filled(3, 3, FILL);
        assert_eq!(coverage_fraction(&qa), 0.0);
    }

    #[test]
    fn test_fallback_order() {
        let mut meta = SceneMetadata::default();
        assert_eq!(scene_coverage(None, &meta), (0.0, CoverageSource::Assumed));

        meta.cloud_cover = Some(42.0);
        assert_eq!(scene_coverage(None, &meta), (42.0, CoverageSource::Metadata));

        let qa = Raster::filled(2, 2, CLOUD_HIGH);
        assert_eq!(scene_coverage(Some(&qa), &meta), (100.0, CoverageSource::QaBand));
    }
}
