//! Index-to-RGB rendering.

use ndarray::Array2;

use crate::scheme::Colormap;

/// Expand an 8-bit index image into red, green and blue planes.
///
/// Index 0 renders black in every plane, keeping nodata at 0.
pub fn apply_colormap(index: &Array2<u8>, cmap: &Colormap) -> [Array2<u8>; 3] {
    [
        index.mapv(|i| cmap.lookup(i).r),
        index.mapv(|i| cmap.lookup(i).g),
        index.mapv(|i| cmap.lookup(i).b),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::Rgb;

    #[test]
    fn apply_keeps_nodata_black() {
        let cmap = Colormap::default_ndvi().unwrap();
        let index = Array2::from_shape_vec((1, 3), vec![0u8, 1, 255]).unwrap();
        let [r, g, b] = apply_colormap(&index, &cmap);

        assert_eq!((r[(0, 0)], g[(0, 0)], b[(0, 0)]), (0, 0, 0));

        let top = cmap.lookup(255);
        assert_eq!(Rgb::new(r[(0, 2)], g[(0, 2)], b[(0, 2)]), top);
        assert_ne!(Rgb::new(r[(0, 1)], g[(0, 1)], b[(0, 1)]), Rgb::NODATA);
    }
}
