//! One composite run, from scene path to written GeoTIFF

use std::path::PathBuf;

use landsat_colormap::Colormap;
use landsat_core::{BandDesignator, BandSet, BoundingBox, Error, Result, Settings};
use tracing::{info, info_span};

use crate::clip::clip_scene;
use crate::cloud::scene_coverage;
use crate::composite::{
    ndvi, pan_sharpen, true_color, CompositeKind, CompositeResult, NdviInputs, NdviMode,
};
use crate::output::{output_filename, scene_output_dir, write_composite};
use crate::pool::ProcessingMode;

/// What to build from which scene
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRequest {
    /// Scene directory or archive
    pub scene_path: PathBuf,
    /// Requested band combination; empty means the default `4, 3, 2`
    pub bands: Vec<BandDesignator>,
    pub kind: CompositeKind,
    /// Clip box in WGS84 degrees
    pub clip: Option<BoundingBox>,
}

impl ProcessRequest {
    pub fn new(scene_path: impl Into<PathBuf>, kind: CompositeKind) -> Self {
        Self {
            scene_path: scene_path.into(),
            bands: Vec::new(),
            kind,
            clip: None,
        }
    }

    pub fn with_bands(mut self, bands: Vec<BandDesignator>) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_clip(mut self, clip: BoundingBox) -> Self {
        self.clip = Some(clip);
        self
    }
}

/// Composite driver bound to one configuration
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    settings: &'a Settings,
}

impl<'a> Pipeline<'a> {
    pub fn new(settings: &'a Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Build and write one composite, returning the output path.
    ///
    /// Any band failure aborts the run before anything is written. A
    /// scratch directory made for clipping is removed on every path.
    pub fn run(&self, request: &ProcessRequest) -> Result<PathBuf> {
        let bands = request.kind.bands(&request.bands);
        let set = BandSet::open(&request.scene_path, &bands, self.settings)?;

        let span = info_span!("composite", scene = set.scene().id(), kind = ?request.kind);
        let _guard = span.enter();

        let clipped = match &request.clip {
            Some(bbox) => Some(clip_scene(&set, bbox, self.settings)?),
            None => None,
        };
        let active = clipped.as_ref().map_or(&set, |c| c.band_set());

        let result = self.composite(active, request.kind)?;

        let scene = set.scene().id();
        let suffix = request.kind.suffix(&bands);
        let dir = scene_output_dir(self.settings, scene)?;
        let path = dir.join(output_filename(scene, Some(&suffix), request.clip.as_ref()));
        write_composite(&result, &path, self.settings.compression)?;

        if let Some(clipped) = clipped {
            clipped.close()?;
        }

        info!(path = %path.display(), "composite finished");
        Ok(path)
    }

    fn composite(&self, set: &BandSet, kind: CompositeKind) -> Result<CompositeResult> {
        let working = self.settings.working_crs();

        match kind {
            CompositeKind::TrueColor => {
                let files = set.read_all()?;
                let coverage = self.coverage(set)?;
                let mode = ProcessingMode::for_bands(files.len(), self.settings.max_workers);
                true_color(files, coverage, &working, mode)
            }
            CompositeKind::PanSharpen => {
                let mut files = set.read_all()?;
                let pan = files
                    .pop()
                    .filter(|f| f.designator == BandDesignator::PAN)
                    .ok_or_else(|| Error::InvalidBand("pan-sharpening needs band 8 last".into()))?;
                let coverage = self.coverage(set)?;
                let mode = ProcessingMode::for_bands(files.len() + 1, self.settings.max_workers);
                pan_sharpen(files, pan, coverage, &working, mode)
            }
            CompositeKind::Ndvi(options) => {
                let meta = set.scene().metadata();
                let red = set.read_band(BandDesignator::Band(4))?;
                let nir = set.read_band(BandDesignator::Band(5))?;
                let qa = if options.cloud_mask {
                    Some(set.read_band(BandDesignator::Qa)?.raster)
                } else {
                    None
                };

                let colormap = match options.mode {
                    NdviMode::Colormap => Some(load_colormap(self.settings)?),
                    NdviMode::Grey => None,
                };

                let inputs = NdviInputs {
                    red: red.raster,
                    nir: nir.raster,
                    qa,
                    red_calibration: meta.calibration(4),
                    nir_calibration: meta.calibration(5),
                };
                let workers = if options.cloud_mask { 3 } else { 2 };
                let mode = ProcessingMode::for_bands(workers, self.settings.max_workers);
                ndvi(inputs, &options, colormap.as_ref(), &working, mode)
            }
        }
    }

    fn coverage(&self, set: &BandSet) -> Result<f64> {
        let qa = set.read_qa()?;
        Ok(scene_coverage(qa.as_ref(), set.scene().metadata()).0)
    }
}

/// The configured colormap file, or the built-in NDVI colormap
pub fn load_colormap(settings: &Settings) -> Result<Colormap> {
    match &settings.colormap_path {
        Some(path) => Colormap::load(path),
        None => Colormap::default_ndvi(),
    }
}
