//! Run configuration
//!
//! A `Settings` value is built once when the process starts and handed to
//! every stage by reference. Nothing reads configuration from globals.

use crate::crs::{CrsKind, CRS, WORKING_EPSG};
use crate::error::{Error, Result};
use crate::io::Compression;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for one composite run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root directory for processed images; each scene gets a sub-directory
    pub output_dir: PathBuf,
    /// Colormap text file for NDVI colour output, `None` for the built-in one
    pub colormap_path: Option<PathBuf>,
    /// EPSG code of the projection every composite is written in
    pub working_epsg: u32,
    /// Upper bound on bands processed concurrently
    pub max_workers: usize,
    /// Re-extract archives even if the extracted directory already exists
    pub force_unzip: bool,
    /// Keep clipped band files next to the scene instead of in a scratch directory
    pub keep_clipped: bool,
    /// Where clip scratch directories are created, `None` for the system temp dir
    pub scratch_dir: Option<PathBuf>,
    /// Compression of every GeoTIFF the run writes
    pub compression: Compression,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            colormap_path: None,
            working_epsg: WORKING_EPSG,
            max_workers: 4,
            force_unzip: false,
            keep_clipped: false,
            scratch_dir: None,
            compression: Compression::default(),
        }
    }
}

impl Settings {
    /// Settings writing into `output_dir`, everything else default
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// The working projection
    pub fn working_crs(&self) -> CRS {
        CRS::from_epsg(self.working_epsg)
    }

    /// Check values that would otherwise fail deep inside a run
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::InvalidParameter {
                name: "max_workers",
                value: "0".into(),
                reason: "at least one worker is required".into(),
            });
        }
        match self.working_crs().kind()? {
            CrsKind::WebMercator => Ok(()),
            _ => Err(Error::UnsupportedCrs(self.working_epsg)),
        }
    }
}

fn default_output_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join("landsat")
        .join("processed")
}
