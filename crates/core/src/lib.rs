//! # Landsat Core
//!
//! Core types and I/O for building composites from Landsat scenes.
//!
//! This crate provides:
//! - `Raster<T>`: generic georeferenced raster grid
//! - `GeoTransform` and `CRS` with the projection math a composite needs
//! - `BoundingBox` for clip requests
//! - `Scene`, `SceneMetadata` and `BandSet` for locating and opening band files
//! - `Settings`, the run configuration shared by every stage
//! - GeoTIFF reading and writing

pub mod bandset;
pub mod bbox;
pub mod config;
pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod scene;

pub use bandset::{parse_band_list, BandDesignator, BandFile, BandSet};
pub use bbox::BoundingBox;
pub use config::Settings;
pub use io::Compression;
pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use scene::{Calibration, Scene, SceneMetadata};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bandset::{BandDesignator, BandFile, BandSet};
    pub use crate::bbox::BoundingBox;
    pub use crate::config::Settings;
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::scene::{Scene, SceneMetadata};
    pub use crate::Algorithm;
}

/// A numeric stage with typed input, output and parameters.
///
/// Stages are pure: the same input and parameters always produce the same
/// output, and nothing is read from the environment.
pub trait Algorithm {
    type Input;
    type Output;
    type Params: Default;
    type Error: std::error::Error;

    /// Short identifier used in log events
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// [`Algorithm::execute`] with `Params::default()`
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
