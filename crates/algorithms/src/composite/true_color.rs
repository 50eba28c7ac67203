//! True-color (and other three-band) composites

use landsat_core::{BandDesignator, BandFile, Result, CRS};
use tracing::info;

use super::{reference_grid, stretch_bands, to_f64, CompositeResult};
use crate::pool::ProcessingMode;
use crate::warp::warp_band;

/// Warp, stretch and stack the given bands in order.
///
/// The last band is the geometry reference. The infra-red pair `[4, 5]`
/// is written without stretching.
pub fn true_color(
    files: Vec<BandFile>,
    coverage: f64,
    working: &CRS,
    mode: ProcessingMode,
) -> Result<CompositeResult> {
    let designators: Vec<BandDesignator> = files.iter().map(|f| f.designator).collect();
    let reference = files
        .last()
        .ok_or_else(|| landsat_core::Error::InvalidBand("no bands requested".into()))?;
    let grid = reference_grid(&reference.raster, working, 1)?;

    info!(
        bands = %designators.iter().map(|b| b.to_string()).collect::<Vec<_>>().join("-"),
        rows = grid.rows,
        cols = grid.cols,
        "projecting"
    );
    let warped = mode.try_map(files, |file| warp_band(&file.raster, &grid).map(to_f64))?;

    let skip = designators == [BandDesignator::Band(4), BandDesignator::Band(5)];
    let planes = stretch_bands(warped, coverage, mode, skip)?;

    CompositeResult::from_planes(planes, grid)
}
