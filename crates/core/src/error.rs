//! Error types for landsat-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scene loading and raster operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{scene}_B{band}.* does not exist ({matches} matching files)")]
    FileDoesNotExist {
        scene: String,
        band: String,
        matches: usize,
    },

    #[error("cannot extract archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Unsupported CRS: EPSG:{0}")]
    UnsupportedCrs(u32),

    #[error("Raster has no CRS: {0}")]
    MissingCrs(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("Invalid band designator: {0}")]
    InvalidBand(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Statistics error: {0}")]
    Statistics(String),

    #[error("Colormap error: {0}")]
    Colormap(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        Error::Tiff(e.to_string())
    }
}

impl From<glob::PatternError> for Error {
    fn from(e: glob::PatternError) -> Self {
        Error::Other(format!("bad file pattern: {}", e))
    }
}

/// Result type alias for landsat-core operations
pub type Result<T> = std::result::Result<T, Error>;
