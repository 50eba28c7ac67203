//! North-up affine georeferencing

use serde::{Deserialize, Serialize};

/// Upper-left origin plus signed pixel size.
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// This is exactly what a GeoTIFF `ModelPixelScale` + `ModelTiepoint` pair
/// can express. Landsat bands and every composite built from them are
/// north-up, so there are no rotation terms and `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X of the upper-left corner of pixel (0, 0)
    pub origin_x: f64,
    /// Y of the upper-left corner of pixel (0, 0)
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Negative for north-up rasters
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Build from GeoTIFF tags.
    ///
    /// `tiepoint` is `[i, j, k, x, y, z]` tying raster point (i, j) to model
    /// point (x, y); `scale` is `[sx, sy, sz]` with `sy` positive for north-up.
    pub fn from_tiepoint(tiepoint: &[f64; 6], scale: &[f64; 3]) -> Self {
        Self::new(
            tiepoint[3] - tiepoint[0] * scale[0],
            tiepoint[4] + tiepoint[1] * scale[1],
            scale[0],
            -scale[1],
        )
    }

    /// `ModelPixelScale` value for this transform
    pub fn pixel_scale(&self) -> [f64; 3] {
        [self.pixel_width, self.pixel_height.abs(), 0.0]
    }

    /// `ModelTiepoint` value tying pixel (0, 0) to the origin
    pub fn tiepoint(&self) -> [f64; 6] {
        [0.0, 0.0, 0.0, self.origin_x, self.origin_y, 0.0]
    }

    /// Map coordinates of a fractional pixel position
    #[inline]
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// Map coordinates of the pixel center
    #[inline]
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Fractional (col, row) of a map position; `floor` gives the pixel index.
    ///
    /// A zero pixel size yields NaN, which every caller treats as outside.
    #[inline]
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        if self.pixel_width == 0.0 || self.pixel_height == 0.0 {
            return (f64::NAN, f64::NAN);
        }
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// Transform of the window whose upper-left pixel is (col_off, row_off)
    pub fn window_transform(&self, col_off: usize, row_off: usize) -> Self {
        let (origin_x, origin_y) = self.apply(col_off as f64, row_off as f64);
        Self {
            origin_x,
            origin_y,
            ..*self
        }
    }

    /// Same footprint with each pixel split `factor` times along both axes
    pub fn refined(&self, factor: f64) -> Self {
        Self {
            pixel_width: self.pixel_width / factor,
            pixel_height: self.pixel_height / factor,
            ..*self
        }
    }

    /// (min_x, min_y, max_x, max_y) of a `width` x `height` raster
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.apply(0.0, 0.0);
        let (x1, y1) = self.apply(width as f64, height as f64);
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
