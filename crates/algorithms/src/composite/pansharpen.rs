//! Pan-sharpened composites

use landsat_core::{BandFile, Error, Result, CRS};
use ndarray::{Array2, Zip};
use tracing::info;

use super::{reference_grid, stretch_bands, to_f64, CompositeResult};
use crate::pool::ProcessingMode;
use crate::warp::{upsample_2x, warp_band};

/// Keeps the ratio finite where every visible band is zero
const RATIO_EPSILON: f64 = 0.1;

/// `pan / (sum(visible) + 0.1)` per pixel
pub fn pan_ratio(visible: &[Array2<f64>], pan: &Array2<f64>) -> Result<Array2<f64>> {
    let [a, b, c] = visible else {
        return Err(Error::InvalidParameter {
            name: "visible",
            value: visible.len().to_string(),
            reason: "pan-sharpening needs exactly 3 visible bands".into(),
        });
    };
    for band in visible {
        if band.dim() != pan.dim() {
            return Err(Error::SizeMismatch {
                er: pan.nrows(),
                ec: pan.ncols(),
                ar: band.nrows(),
                ac: band.ncols(),
            });
        }
    }

    let mut ratio = Array2::<f64>::zeros(pan.dim());
    Zip::from(&mut ratio)
        .and(a)
        .and(b)
        .and(c)
        .and(pan)
        .for_each(|r, &a, &b, &c, &p| *r = p / (a + b + c + RATIO_EPSILON));
    Ok(ratio)
}

/// Three visible bands sharpened with the panchromatic band.
///
/// The destination grid has twice the rows and columns of the visible
/// bands; the visible bands are upsampled before warping so all four
/// share it.
pub fn pan_sharpen(
    visible: Vec<BandFile>,
    pan: BandFile,
    coverage: f64,
    working: &CRS,
    mode: ProcessingMode,
) -> Result<CompositeResult> {
    if visible.len() != 3 {
        return Err(Error::InvalidParameter {
            name: "bands",
            value: visible.len().to_string(),
            reason: "pan-sharpening needs exactly 3 visible bands".into(),
        });
    }

    let reference = &visible[visible.len() - 1];
    let grid = reference_grid(&reference.raster, working, 2)?;
    info!(rows = grid.rows, cols = grid.cols, "projecting upsampled bands");

    let mut sources: Vec<(bool, BandFile)> = visible.into_iter().map(|f| (true, f)).collect();
    sources.push((false, pan));

    let mut warped = mode.try_map(sources, |(upsample, file)| {
        let raster = if upsample {
            warp_band(&upsample_2x(&file.raster)?, &grid)?
        } else {
            warp_band(&file.raster, &grid)?
        };
        Ok(to_f64(raster))
    })?;

    let pan = warped.pop().ok_or_else(|| Error::Other("missing pan band".into()))?;
    info!("calculating pan ratio");
    let ratio = pan_ratio(&warped, &pan)?;
    let sharpened: Vec<Array2<f64>> = warped.into_iter().map(|band| band * &ratio).collect();

    let planes = stretch_bands(sharpened, coverage, mode, false)?;
    CompositeResult::from_planes(planes, grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pan_ratio() {
        let visible = vec![
            Array2::from_elem((2, 2), 100.0),
            Array2::from_elem((2, 2), 200.0),
            Array2::from_elem((2, 2), 300.0),
        ];
        let pan = Array2::from_elem((2, 2), 1200.0);
        let ratio = pan_ratio(&visible, &pan).unwrap();
        assert_relative_eq!(ratio[(0, 0)], 1200.0 / 600.1);
    }

    #[test]
    fn test_pan_ratio_zero_sum_is_finite() {
        let visible = vec![Array2::zeros((1, 1)); 3];
        let pan = Array2::from_elem((1, 1), 5.0);
        let ratio = pan_ratio(&visible, &pan).unwrap();
        assert_relative_eq!(ratio[(0, 0)], 50.0);
    }

    #[test]
    fn test_pan_ratio_shape_checks() {
        let pan = Array2::zeros((2, 2));
        assert!(pan_ratio(&[Array2::zeros((2, 2))], &pan).is_err());
        let visible = vec![Array2::zeros((2, 3)); 3];
        assert!(pan_ratio(&visible, &pan).is_err());
    }
}
