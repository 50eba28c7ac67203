//! # Landsat Algorithms
//!
//! The composite pipeline for Landsat scenes.
//!
//! ## Stages
//!
//! - **geometry**: destination grid in the working projection
//! - **warp**: nearest-neighbour reprojection and 2x upsampling
//! - **cloud**: cloud/snow coverage from the QA band
//! - **stretch**: cloud-aware percentile stretch
//! - **composite**: true-color, pan-sharpened and NDVI composites
//! - **clip**: bounding-box clipping ahead of compositing
//! - **output**: file naming and GeoTIFF writing
//! - **pipeline**: the driver tying the stages together

pub mod clip;
pub mod cloud;
pub mod composite;
pub mod geometry;
pub mod output;
pub mod pipeline;
pub mod pool;
pub mod stretch;
pub mod warp;

pub use composite::{CompositeKind, CompositeResult, NdviMode, NdviOptions, Photometric};
pub use geometry::{resolve_grid, RasterGrid, SourceGeometry};
pub use pipeline::{Pipeline, ProcessRequest};
pub use pool::ProcessingMode;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::clip::{adjust, clip_scene, ClippedScene};
    pub use crate::cloud::{coverage_fraction, scene_coverage};
    pub use crate::composite::{CompositeKind, CompositeResult, NdviMode, NdviOptions};
    pub use crate::geometry::{resolve_grid, RasterGrid};
    pub use crate::output::{output_filename, write_composite};
    pub use crate::pipeline::{Pipeline, ProcessRequest};
    pub use crate::stretch::{stretch, PercentileStretch, StretchParams};
    pub use crate::warp::{upsample_2x, warp_band};
    pub use landsat_core::prelude::*;
}
