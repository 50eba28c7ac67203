//! Destination grid resolution
//!
//! The destination grid is derived from one reference band: its four
//! corners are projected into the working CRS and a uniform grid is laid
//! over their envelope. This is an approximation of the true footprint,
//! good enough for the near-rectilinear rasters Landsat ships.

use landsat_core::crs::transform_point;
use landsat_core::{Error, GeoTransform, Raster, RasterElement, Result, CRS};
use tracing::debug;

/// Georeferencing of a source band
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGeometry {
    pub transform: GeoTransform,
    pub crs: CRS,
    /// (rows, cols)
    pub shape: (usize, usize),
}

impl SourceGeometry {
    pub fn of<T: RasterElement>(raster: &Raster<T>) -> Result<Self> {
        Ok(Self {
            transform: *raster.transform(),
            crs: raster.require_crs()?.clone(),
            shape: raster.shape(),
        })
    }
}

/// Destination geometry shared by every band of a composite
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    pub rows: usize,
    pub cols: usize,
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub transform: GeoTransform,
    pub crs: CRS,
}

impl RasterGrid {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// (min_x, min_y, max_x, max_y) in the grid's CRS
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols, self.rows)
    }

    /// Zeroed raster laid out on this grid
    pub fn empty_raster<T: RasterElement>(&self) -> Raster<T> {
        let mut raster = Raster::new(self.rows, self.cols);
        raster.set_transform(self.transform);
        raster.set_crs(Some(self.crs.clone()));
        raster
    }
}

/// Resolve the destination grid for `reference` in `dst`.
///
/// `shape` is the destination (rows, cols); it is the reference shape for
/// plain composites and twice that for pan-sharpening. The corner
/// positions use the reference's x pixel size along both axes.
pub fn resolve_grid(
    reference: &SourceGeometry,
    dst: &CRS,
    shape: (usize, usize),
) -> Result<RasterGrid> {
    let (rows, cols) = shape;
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let (src_rows, src_cols) = reference.shape;
    let pixel = reference.transform.pixel_width;
    let ul_x = reference.transform.origin_x;
    let ul_y = reference.transform.origin_y;
    let lr_x = ul_x + pixel * src_cols as f64;
    let lr_y = ul_y - pixel * src_rows as f64;

    let corners = [(ul_x, ul_y), (lr_x, ul_y), (ul_x, lr_y), (lr_x, lr_y)];

    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for (x, y) in corners {
        let (tx, ty) = transform_point(&reference.crs, dst, x, y)?;
        min_x = min_x.min(tx);
        max_x = max_x.max(tx);
        min_y = min_y.min(ty);
        max_y = max_y.max(ty);
    }

    let pixel_x = (max_x - min_x).abs() / cols as f64;
    let pixel_y = (max_y - min_y).abs() / rows as f64;

    debug!(
        rows,
        cols,
        pixel_x,
        pixel_y,
        min_x,
        max_y,
        "resolved destination grid"
    );

    Ok(RasterGrid {
        rows,
        cols,
        pixel_x,
        pixel_y,
        transform: GeoTransform::new(min_x, max_y, pixel_x, -pixel_y),
        crs: dst.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn utm_reference() -> SourceGeometry {
        SourceGeometry {
            transform: GeoTransform::new(500_000.0, 3_400_000.0, 30.0, -30.0),
            crs: CRS::utm(16, true),
            shape: (200, 300),
        }
    }

    #[test]
    fn test_same_crs_keeps_footprint() {
        let reference = SourceGeometry {
            crs: CRS::web_mercator(),
            ..utm_reference()
        };
        let grid = resolve_grid(&reference, &CRS::web_mercator(), (200, 300)).unwrap();

        assert_relative_eq!(grid.pixel_x, 30.0, epsilon = 1e-9);
        assert_relative_eq!(grid.pixel_y, 30.0, epsilon = 1e-9);
        assert_eq!(
            grid.transform,
            GeoTransform::new(500_000.0, 3_400_000.0, 30.0, -30.0)
        );
    }

    #[test]
    fn test_utm_to_mercator() {
        let grid = resolve_grid(&utm_reference(), &CRS::web_mercator(), (200, 300)).unwrap();
        assert_eq!(grid.shape(), (200, 300));
        assert_eq!(grid.crs.epsg(), 3857);
        assert!(grid.transform.pixel_height < 0.0);

        // Mercator stretches distances by 1/cos(lat), about 1.15 near 30N
        assert!(grid.pixel_x > 30.0 && grid.pixel_x < 40.0);
        assert!(grid.pixel_y > 30.0 && grid.pixel_y < 40.0);

        let (min_x, _, _, max_y) = grid.bounds();
        assert_relative_eq!(min_x, grid.transform.origin_x);
        assert_relative_eq!(max_y, grid.transform.origin_y);
    }

    #[test]
    fn test_doubled_shape_halves_pixels() {
        let single = resolve_grid(&utm_reference(), &CRS::web_mercator(), (200, 300)).unwrap();
        let double = resolve_grid(&utm_reference(), &CRS::web_mercator(), (400, 600)).unwrap();

        assert_eq!(double.shape(), (400, 600));
        assert_relative_eq!(double.pixel_x * 2.0, single.pixel_x, epsilon = 1e-9);
        assert_relative_eq!(double.pixel_y * 2.0, single.pixel_y, epsilon = 1e-9);
        assert_eq!(double.transform.origin_x, single.transform.origin_x);
    }

    #[test]
    fn test_empty_shape_rejected() {
        assert!(resolve_grid(&utm_reference(), &CRS::web_mercator(), (0, 10)).is_err());
    }
}
