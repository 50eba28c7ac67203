//! # Landsat Colormap
//!
//! 256-entry colormaps for rendering 8-bit index images (NDVI) as RGB.
//!
//! A colormap is read from a small text resource: a `mode = <max>` header
//! followed by one `R G B` line per entry, values scaled to `<max>`. Entry
//! `0` is always black so nodata stays transparent in the written image.
//!
//! ## Usage
//!
//! ```ignore
//! use landsat_colormap::{apply_colormap, Colormap};
//!
//! let cmap = Colormap::default_ndvi()?;
//! let [r, g, b] = apply_colormap(&ndvi_index, &cmap);
//! ```

mod render;
mod scheme;

pub use render::apply_colormap;
pub use scheme::{Colormap, Rgb};
