//! NDVI composites

use landsat_colormap::{apply_colormap, Colormap};
use landsat_core::{Calibration, Error, Raster, Result, CRS};
use ndarray::Array2;
use rayon::prelude::*;
use tracing::info;

use super::{reference_grid, CompositeResult, NdviMode, NdviOptions};
use crate::cloud::cloud_or_cirrus;
use crate::pool::ProcessingMode;
use crate::warp::warp_band;

/// Source rasters and calibration for one NDVI run
#[derive(Debug, Clone)]
pub struct NdviInputs {
    pub red: Raster<u16>,
    pub nir: Raster<u16>,
    /// Quality band, required when cloud masking
    pub qa: Option<Raster<u16>>,
    pub red_calibration: Calibration,
    pub nir_calibration: Calibration,
}

/// NDVI scaled to `0..=255` as `round((ndvi + 1) * 255 / 2)`.
///
/// Both bands are calibrated first. A pixel is 0 when the raw or the
/// calibrated `nir + red` is zero, and when `qa` marks it as cloud or
/// cirrus. NDVI is clamped to `[-1, 1]`.
pub fn ndvi_index(
    red: &Array2<u16>,
    nir: &Array2<u16>,
    qa: Option<&Array2<u16>>,
    red_cal: Calibration,
    nir_cal: Calibration,
) -> Result<Array2<u8>> {
    let (rows, cols) = red.dim();
    if nir.dim() != (rows, cols) || qa.map_or(false, |q| q.dim() != (rows, cols)) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: nir.nrows(),
            ac: nir.ncols(),
        });
    }

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let r = red[(row, col)];
                let n = nir[(row, col)];
                if u32::from(r) + u32::from(n) == 0 {
                    continue;
                }
                if let Some(qa) = qa {
                    if cloud_or_cirrus(qa[(row, col)]) {
                        continue;
                    }
                }

                let r = red_cal.apply(f64::from(r));
                let n = nir_cal.apply(f64::from(n));
                let sum = n + r;
                if sum == 0.0 {
                    continue;
                }

                let ndvi = ((n - r) / sum).clamp(-1.0, 1.0);
                *out = ((ndvi + 1.0) * 255.0 / 2.0).round() as u8;
            }
            row_data
        })
        .collect();

    Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))
}

/// NDVI composite, greyscale or through `colormap`
pub fn ndvi(
    inputs: NdviInputs,
    options: &NdviOptions,
    colormap: Option<&Colormap>,
    working: &CRS,
    mode: ProcessingMode,
) -> Result<CompositeResult> {
    let NdviInputs {
        red,
        nir,
        qa,
        red_calibration,
        nir_calibration,
    } = inputs;

    let qa = if options.cloud_mask {
        Some(qa.ok_or_else(|| Error::InvalidParameter {
            name: "cloud_mask",
            value: "true".into(),
            reason: "the scene has no QA band".into(),
        })?)
    } else {
        None
    };

    let grid = reference_grid(&nir, working, 1)?;
    info!(rows = grid.rows, cols = grid.cols, cloud_mask = options.cloud_mask, "NDVI processing started");

    let mut sources = vec![red, nir];
    sources.extend(qa);
    let mut warped = mode.try_map(sources, |raster| warp_band(&raster, &grid).map(Raster::into_array))?;

    let qa = if options.cloud_mask { warped.pop() } else { None };
    let nir = warped.pop().ok_or_else(|| Error::Other("missing NIR band".into()))?;
    let red = warped.pop().ok_or_else(|| Error::Other("missing red band".into()))?;

    let index = ndvi_index(&red, &nir, qa.as_ref(), red_calibration, nir_calibration)?;

    match options.mode {
        NdviMode::Grey => CompositeResult::from_planes(vec![index], grid),
        NdviMode::Colormap => {
            let cmap = colormap.ok_or_else(|| Error::Colormap("no colormap loaded".into()))?;
            info!("applying colormap");
            CompositeResult::from_planes(apply_colormap(&index, cmap).into(), grid)
        }
    }
}
