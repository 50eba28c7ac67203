//! Output naming and GeoTIFF writing for composites

use std::fs;
use std::path::{Path, PathBuf};

use landsat_core::io::{write_geotiff_u8, Compression};
use landsat_core::{BoundingBox, Result, Settings};
use ndarray::ArrayView2;
use tracing::info;

use crate::composite::CompositeResult;

const POLYLINE_PRECISION: f64 = 1e5;

/// Encode points with the Google polyline algorithm at 5 decimal places.
///
/// Each coordinate is delta-encoded against the same coordinate of the
/// previous point, in tuple order. Scaled values are rounded half away
/// from zero, so `2.5e-5` encodes like `3e-5`; names produced by the
/// Python 2 era tools round the same way.
pub fn encode_polyline(points: &[(f64, f64)]) -> String {
    let mut out = String::new();
    let mut prev = (0i64, 0i64);

    for &(a, b) in points {
        let a = (a * POLYLINE_PRECISION).round() as i64;
        let b = (b * POLYLINE_PRECISION).round() as i64;
        encode_value(a - prev.0, &mut out);
        encode_value(b - prev.1, &mut out);
        prev = (a, b);
    }
    out
}

fn encode_value(delta: i64, out: &mut String) {
    let zigzag = if delta < 0 { !(delta << 1) } else { delta << 1 };
    let mut v = zigzag as u64;
    while v >= 0x20 {
        out.push(char::from((((v & 0x1f) | 0x20) + 63) as u8));
        v >>= 5;
    }
    out.push(char::from((v + 63) as u8));
}

/// File name of a composite:
///
/// ```text
/// {scene}[_{suffix}][_clipped_{polyline}].TIF
/// ```
///
/// where the polyline encodes `[(xmin, ymin), (xmax, ymax)]` of the clip box.
pub fn output_filename(scene: &str, suffix: Option<&str>, clip: Option<&BoundingBox>) -> String {
    let mut name = scene.to_string();
    if let Some(suffix) = suffix {
        name.push('_');
        name.push_str(suffix);
    }
    if let Some(bbox) = clip {
        name.push_str("_clipped_");
        name.push_str(&encode_polyline(&[
            (bbox.min_x, bbox.min_y),
            (bbox.max_x, bbox.max_y),
        ]));
    }
    name.push_str(".TIF");
    name
}

/// `{output_dir}/{scene}`, created if missing
pub fn scene_output_dir(settings: &Settings, scene: &str) -> Result<PathBuf> {
    let dir = settings.output_dir.join(scene);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Write a composite as an 8-bit GeoTIFF in the grid's CRS
pub fn write_composite(
    result: &CompositeResult,
    path: &Path,
    compression: Compression,
) -> Result<()> {
    let views: Vec<ArrayView2<'_, u8>> = result.bands.iter().map(|b| b.view()).collect();
    write_geotiff_u8(
        &views,
        &result.grid.transform,
        Some(&result.grid.crs),
        path,
        compression,
    )?;
    info!(path = %path.display(), bands = views.len(), "wrote composite");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::Photometric;
    use crate::geometry::RasterGrid;
    use landsat_core::io::read_geotiff_bands;
    use landsat_core::{GeoTransform, Raster, CRS};
    use ndarray::Array2;

    #[test]
    fn test_polyline_reference_vector() {
        let points = [(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)];
        assert_eq!(encode_polyline(&points), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }

    #[test]
    fn test_polyline_halves_round_away_from_zero() {
        let half = encode_polyline(&[(2.5e-5, -2.5e-5)]);
        assert_eq!(half, encode_polyline(&[(3e-5, -3e-5)]));
        assert_ne!(half, encode_polyline(&[(2e-5, -2e-5)]));
    }

    #[test]
    fn test_plain_names() {
        assert_eq!(
            output_filename("LC80030172015001LGN00", Some("bands_432"), None),
            "LC80030172015001LGN00_bands_432.TIF"
        );
        assert_eq!(
            output_filename("LC80030172015001LGN00", Some("NDVI"), None),
            "LC80030172015001LGN00_NDVI.TIF"
        );
        assert_eq!(output_filename("S", None, None), "S.TIF");
    }

    #[test]
    fn test_clipped_name() {
        let bbox = BoundingBox::new(-87.48, 30.70, -87.43, 30.74);
        let name = output_filename("S", Some("bands_432_pan"), Some(&bbox));
        let expected = format!(
            "S_bands_432_pan_clipped_{}.TIF",
            encode_polyline(&[(-87.48, 30.70), (-87.43, 30.74)])
        );
        assert_eq!(name, expected);
        assert!(!name.contains(' '));
    }

    #[test]
    fn test_write_composite_rgb() {
        let dir = tempfile::TempDir::new().unwrap();
        let grid = RasterGrid {
            rows: 3,
            cols: 4,
            pixel_x: 30.0,
            pixel_y: 30.0,
            transform: GeoTransform::new(-9_700_000.0, 3_500_000.0, 30.0, -30.0),
            crs: CRS::web_mercator(),
        };
        let result = CompositeResult {
            bands: vec![
                Array2::from_elem((3, 4), 1u8),
                Array2::from_elem((3, 4), 2u8),
                Array2::from_elem((3, 4), 3u8),
            ],
            grid,
            photometric: Photometric::Rgb,
        };

        let settings = Settings::with_output_dir(dir.path());
        let out_dir = scene_output_dir(&settings, "S").unwrap();
        let path = out_dir.join(output_filename("S", Some("bands_432"), None));
        write_composite(&result, &path, settings.compression).unwrap();

        let planes: Vec<Raster<u8>> = read_geotiff_bands(&path).unwrap();
        assert_eq!(planes.len(), 3);
        assert_eq!(planes[1].get(2, 3).unwrap(), 2);
        assert_eq!(planes[0].transform(), &result.grid.transform);
    }
}
