//! Reprojection of source bands into the destination grid

use landsat_core::crs::transform_point;
use landsat_core::{Error, Raster, RasterElement, Result};
use rayon::prelude::*;

use crate::geometry::RasterGrid;

/// Reproject `src` onto `grid` with nearest-neighbour resampling.
///
/// Every destination pixel centre is mapped back into the source CRS and
/// takes the value of the source pixel it lands in; centres outside the
/// source raster stay 0.
pub fn warp_band<T: RasterElement>(src: &Raster<T>, grid: &RasterGrid) -> Result<Raster<T>> {
    let src_crs = src.require_crs()?;
    // Fail up front instead of per pixel
    src_crs.kind()?;
    grid.crs.kind()?;

    let (src_rows, src_cols) = src.shape();
    let (rows, cols) = grid.shape();
    let same_crs = src_crs.is_equivalent(&grid.crs);

    let data: Vec<T> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![T::zero(); cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let (x, y) = grid.transform.pixel_to_geo(col, row);
                let (sx, sy) = if same_crs {
                    (x, y)
                } else {
                    match transform_point(&grid.crs, src_crs, x, y) {
                        Ok(p) => p,
                        Err(_) => continue,
                    }
                };

                let (fc, fr) = src.geo_to_pixel(sx, sy);
                if !(fc >= 0.0 && fr >= 0.0) {
                    continue;
                }
                let (sc, sr) = (fc.floor() as usize, fr.floor() as usize);
                if sc < src_cols && sr < src_rows {
                    *out = unsafe { src.get_unchecked(sr, sc) };
                }
            }
            row_data
        })
        .collect();

    let mut output = grid.empty_raster::<T>();
    *output.data_mut() = ndarray::Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Upsample by two along both axes with bilinear interpolation.
///
/// The footprint is unchanged: the transform keeps its origin and the
/// pixel size is halved. Where any contributing neighbour is fill the
/// nearest source value is used instead, so nodata edges stay sharp.
pub fn upsample_2x<T: RasterElement>(src: &Raster<T>) -> Result<Raster<T>> {
    let (src_rows, src_cols) = src.shape();
    if src_rows == 0 || src_cols == 0 {
        return Err(Error::InvalidDimensions {
            width: src_cols,
            height: src_rows,
        });
    }
    let (rows, cols) = (src_rows * 2, src_cols * 2);

    let sample = |r: usize, c: usize| unsafe { src.get_unchecked(r, c) };

    let data: Vec<T> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![T::zero(); cols];
            let fy = ((row as f64 + 0.5) / 2.0 - 0.5).clamp(0.0, (src_rows - 1) as f64);
            let r0 = fy.floor() as usize;
            let r1 = (r0 + 1).min(src_rows - 1);
            let wy = fy - r0 as f64;

            for (col, out) in row_data.iter_mut().enumerate() {
                let fx = ((col as f64 + 0.5) / 2.0 - 0.5).clamp(0.0, (src_cols - 1) as f64);
                let c0 = fx.floor() as usize;
                let c1 = (c0 + 1).min(src_cols - 1);
                let wx = fx - c0 as f64;

                let q = [sample(r0, c0), sample(r0, c1), sample(r1, c0), sample(r1, c1)];
                if q.iter().any(|v| v.is_fill()) {
                    *out = sample(row / 2, col / 2);
                    continue;
                }

                let top = q[0].to_f64() * (1.0 - wx) + q[1].to_f64() * wx;
                let bottom = q[2].to_f64() * (1.0 - wx) + q[3].to_f64() * wx;
                let value = top * (1.0 - wy) + bottom * wy;
                *out = if T::is_float() {
                    T::from_f64(value)
                } else {
                    T::from_f64(value.round())
                };
            }
            row_data
        })
        .collect();

    let mut output = Raster::from_vec(data, rows, cols)?;
    output.set_transform(src.transform().refined(2.0));
    output.set_crs(src.crs().cloned());
    Ok(output)
}
