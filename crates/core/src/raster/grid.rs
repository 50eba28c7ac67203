//! Georeferenced band grid

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{s, Array2, ArrayView2};

/// One band: cells in row-major `(row, col)` order plus the transform and
/// CRS that place them on the map.
///
/// There is no per-raster nodata value. Zero is fill in every Landsat
/// product (see [`RasterElement::is_fill`]) and the composites keep it.
///
/// ```ignore
/// use landsat_core::Raster;
///
/// let mut band: Raster<u16> = Raster::new(100, 100);
/// band.set(10, 20, 9000)?;
/// assert_eq!(band.get(10, 20)?, 9000);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
}

/// Pixel window into a raster, in whole pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl Window {
    fn fits(&self, rows: usize, cols: usize) -> bool {
        self.width > 0
            && self.height > 0
            && self.col_off + self.width <= cols
            && self.row_off + self.height <= rows
    }
}

impl<T: RasterElement> Raster<T> {
    /// All-fill raster
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Wrap decoded samples; `data.len()` must be `rows * cols`
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        Array2::from_shape_vec((rows, cols), data)
            .map(Self::from_array)
            .map_err(|_| Error::InvalidDimensions {
                width: cols,
                height: rows,
            })
    }

    /// Ungeoreferenced raster over `data`
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
        }
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or_else(|| self.out_of_bounds(row, col))
    }

    /// Read a cell with no bounds check.
    ///
    /// # Safety
    /// `row < self.rows()` and `col < self.cols()` must hold.
    #[inline]
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let err = self.out_of_bounds(row, col);
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(err),
        }
    }

    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// The CRS, or `MissingCrs` for a band without georeferencing
    pub fn require_crs(&self) -> Result<&CRS> {
        self.crs
            .as_ref()
            .ok_or_else(|| Error::MissingCrs(format!("{}x{} raster", self.cols(), self.rows())))
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// (min_x, min_y, max_x, max_y) in the raster's own CRS
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Map position of a pixel centre
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Fractional pixel position of a map point
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    /// Owned copy of `window`, its transform moved to the window origin
    pub fn crop(&self, window: Window) -> Result<Self> {
        if !window.fits(self.rows(), self.cols()) {
            return Err(self.out_of_bounds(
                window.row_off + window.height,
                window.col_off + window.width,
            ));
        }

        let Window {
            col_off,
            row_off,
            width,
            height,
        } = window;
        Ok(Self {
            data: self
                .data
                .slice(s![row_off..row_off + height, col_off..col_off + width])
                .to_owned(),
            transform: self.transform.window_transform(col_off, row_off),
            crs: self.crs.clone(),
        })
    }

    /// Min, max and mean over the non-fill cells
    pub fn statistics(&self) -> RasterStatistics<T> {
        let init = RasterStatistics {
            min: None,
            max: None,
            mean: None,
            valid_count: 0,
            fill_count: 0,
        };
        let (mut stats, sum) = self.data.iter().fold((init, 0.0), |(mut st, sum), &v| {
            if v.is_fill() {
                st.fill_count += 1;
                return (st, sum);
            }
            st.valid_count += 1;
            if st.min.map_or(true, |m| v < m) {
                st.min = Some(v);
            }
            if st.max.map_or(true, |m| v > m) {
                st.max = Some(v);
            }
            (st, sum + v.to_f64())
        });
        if stats.valid_count > 0 {
            stats.mean = Some(sum / stats.valid_count as f64);
        }
        stats
    }

    fn out_of_bounds(&self, row: usize, col: usize) -> Error {
        Error::IndexOutOfBounds {
            row,
            col,
            rows: self.rows(),
            cols: self.cols(),
        }
    }
}

/// Summary of the non-fill cells of a raster
#[derive(Debug, Clone, PartialEq)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub fill_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<u16> = Raster::new(100, 200);
        assert_eq!(raster.shape(), (100, 200));
        assert!(raster.data().iter().all(|v| v.is_fill()));
        assert!(Raster::<u16>::from_vec(vec![1, 2, 3], 2, 2).is_err());
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<u16> = Raster::new(10, 10);
        raster.set(5, 5, 4200).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 4200);
        assert!(raster.get(10, 0).is_err());
        assert!(matches!(
            raster.set(0, 10, 1),
            Err(Error::IndexOutOfBounds { col: 10, .. })
        ));
    }

    #[test]
    fn test_statistics_skip_fill() {
        let mut raster: Raster<u16> = Raster::new(10, 10);
        for i in 0..10 {
            for j in 0..5 {
                raster.set(i, j, (i * 10 + j + 1) as u16).unwrap();
            }
        }

        let stats = raster.statistics();
        assert_eq!(stats.min, Some(1));
        assert_eq!(stats.max, Some(95));
        assert_eq!(stats.valid_count, 50);
        assert_eq!(stats.fill_count, 50);
        assert_eq!(stats.mean, Some(48.0));

        assert_eq!(Raster::<u16>::new(2, 2).statistics().mean, None);
    }

    #[test]
    fn test_crop_moves_origin() {
        let mut raster: Raster<u16> = Raster::new(20, 30);
        raster.set_transform(GeoTransform::new(500.0, 900.0, 30.0, -30.0));
        raster.set(6, 11, 77).unwrap();

        let window = Window {
            col_off: 10,
            row_off: 5,
            width: 4,
            height: 3,
        };
        let cropped = raster.crop(window).unwrap();

        assert_eq!(cropped.shape(), (3, 4));
        assert_eq!(cropped.get(1, 1).unwrap(), 77);
        assert_eq!(cropped.transform().origin_x, 800.0);
        assert_eq!(cropped.transform().origin_y, 750.0);
    }

    #[test]
    fn test_crop_out_of_range() {
        let raster: Raster<u16> = Raster::new(5, 5);
        let window = Window {
            col_off: 3,
            row_off: 0,
            width: 4,
            height: 2,
        };
        assert!(raster.crop(window).is_err());
    }
}
