//! Composite generation
//!
//! Three composites share the warp, stretch and write stages and differ
//! only in the band math between them. [`CompositeKind`] picks the
//! variant; the stage helpers here are what they have in common.

mod ndvi;
mod pansharpen;
mod true_color;

pub use ndvi::{ndvi, ndvi_index, NdviInputs};
pub use pansharpen::{pan_ratio, pan_sharpen};
pub use true_color::true_color;

use landsat_core::{Algorithm, BandDesignator, Error, Raster, Result, CRS};
use ndarray::Array2;
use tracing::debug;

use crate::geometry::{resolve_grid, RasterGrid, SourceGeometry};
use crate::pool::ProcessingMode;
use crate::stretch::{to_u8, PercentileStretch, StretchParams};

/// Band combination used when none is requested
pub const DEFAULT_BANDS: [BandDesignator; 3] = [
    BandDesignator::Band(4),
    BandDesignator::Band(3),
    BandDesignator::Band(2),
];

/// Red and near-infrared, the NDVI pair
pub const NDVI_BANDS: [BandDesignator; 2] = [BandDesignator::Band(4), BandDesignator::Band(5)];

/// How NDVI values are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NdviMode {
    /// Single greyscale band
    Grey,
    /// Three bands through the 256-entry colormap
    #[default]
    Colormap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NdviOptions {
    pub mode: NdviMode,
    /// Zero out cloud and cirrus pixels using the QA band
    pub cloud_mask: bool,
}

/// Which composite to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeKind {
    #[default]
    TrueColor,
    PanSharpen,
    Ndvi(NdviOptions),
}

impl CompositeKind {
    /// Bands to open for a request. NDVI always uses bands 4 and 5;
    /// pan-sharpening adds band 8 after the visible bands.
    pub fn bands(&self, requested: &[BandDesignator]) -> Vec<BandDesignator> {
        let visible: Vec<BandDesignator> = if requested.is_empty() {
            DEFAULT_BANDS.to_vec()
        } else {
            requested.to_vec()
        };

        match self {
            CompositeKind::TrueColor => visible,
            CompositeKind::PanSharpen => {
                let mut bands: Vec<_> = visible
                    .into_iter()
                    .filter(|b| *b != BandDesignator::PAN)
                    .collect();
                bands.push(BandDesignator::PAN);
                bands
            }
            CompositeKind::Ndvi(_) => NDVI_BANDS.to_vec(),
        }
    }

    /// File name suffix, e.g. `bands_432`, `bands_432_pan`, `NDVI`
    pub fn suffix(&self, bands: &[BandDesignator]) -> String {
        let joined: String = bands
            .iter()
            .filter(|b| **b != BandDesignator::PAN || *self == CompositeKind::TrueColor)
            .map(|b| b.to_string())
            .collect();

        match self {
            CompositeKind::TrueColor => format!("bands_{}", joined),
            CompositeKind::PanSharpen => format!("bands_{}_pan", joined),
            CompositeKind::Ndvi(_) => "NDVI".to_string(),
        }
    }
}

/// Color interpretation of the written bands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Photometric {
    Grey,
    Rgb,
}

/// 8-bit bands ready to be written, and the grid they sit on
#[derive(Debug, Clone)]
pub struct CompositeResult {
    pub bands: Vec<Array2<u8>>,
    pub grid: RasterGrid,
    pub photometric: Photometric,
}

impl CompositeResult {
    /// Wrap 1 to 3 planes; two planes get an empty third so the image is RGB
    pub(crate) fn from_planes(mut bands: Vec<Array2<u8>>, grid: RasterGrid) -> Result<Self> {
        let photometric = match bands.len() {
            1 => Photometric::Grey,
            2 => {
                bands.push(Array2::zeros(grid.shape()));
                Photometric::Rgb
            }
            3 => Photometric::Rgb,
            n => {
                return Err(Error::InvalidParameter {
                    name: "bands",
                    value: n.to_string(),
                    reason: "a composite has 1 to 3 bands".into(),
                })
            }
        };
        Ok(Self {
            bands,
            grid,
            photometric,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.grid.shape()
    }
}

/// Destination grid from a reference band, with its shape scaled by `scale`
pub(crate) fn reference_grid(
    reference: &Raster<u16>,
    working: &CRS,
    scale: usize,
) -> Result<RasterGrid> {
    let geometry = SourceGeometry::of(reference)?;
    let (rows, cols) = geometry.shape;
    resolve_grid(&geometry, working, (rows * scale, cols * scale))
}

/// Stretch each band and quantise to 8 bits.
///
/// With `skip` the raw values are only quantised.
pub(crate) fn stretch_bands(
    bands: Vec<Array2<f64>>,
    coverage: f64,
    mode: ProcessingMode,
    skip: bool,
) -> Result<Vec<Array2<u8>>> {
    if skip {
        debug!("stretch skipped for this band combination");
        return Ok(bands
            .iter()
            .map(|b| b.mapv(|v| ((v.clamp(0.0, 65535.0) as u16) >> 8) as u8))
            .collect());
    }

    let params = StretchParams::with_coverage(coverage);
    mode.try_map(bands, |band| {
        PercentileStretch
            .execute(band, params)
            .map(|s| to_u8(&s))
    })
}

pub(crate) fn to_f64(raster: Raster<u16>) -> Array2<f64> {
    raster.into_array().mapv(f64::from)
}
