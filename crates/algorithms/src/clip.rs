//! Bounding-box clipping ahead of compositing
//!
//! The requested box is given in WGS84 degrees. For each band the raster
//! bounds are brought into WGS84, the request is reconciled with them by
//! [`adjust`], and the resulting box is cut out of the band in its own
//! CRS. Clipped bands are written to a scratch directory that lives as
//! long as the returned [`ClippedScene`], under `Settings::scratch_dir`
//! when one is set.

use std::fs;
use std::path::{Path, PathBuf};

use landsat_core::crs::transform_bounds;
use landsat_core::io::write_geotiff;
use landsat_core::raster::Window;
use landsat_core::{
    BandDesignator, BandSet, BoundingBox, Error, Raster, Result, Settings, CRS,
};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Reconcile a requested box with the source box.
///
/// A request that misses the source entirely along either axis is
/// ignored and the source box comes back unchanged; the caller gets the
/// whole scene rather than an empty image. Otherwise each edge is pulled
/// in to the source edge it overshoots.
pub fn adjust(source: &BoundingBox, target: &BoundingBox) -> BoundingBox {
    if source.disjoint_x(target) || source.disjoint_y(target) {
        return *source;
    }

    BoundingBox {
        min_x: target.min_x.max(source.min_x),
        min_y: target.min_y.max(source.min_y),
        max_x: target.max_x.min(source.max_x),
        max_y: target.max_y.min(source.max_y),
    }
}

/// Pixel window covering `bounds` (in the raster's CRS), clamped to the raster
fn window_for(raster: &Raster<u16>, bounds: &BoundingBox) -> Result<Window> {
    let gt = raster.transform();
    let (rows, cols) = raster.shape();

    let (c0, r0) = gt.geo_to_pixel(bounds.min_x, bounds.max_y);
    let (c1, r1) = gt.geo_to_pixel(bounds.max_x, bounds.min_y);

    let clamp = |v: f64, max: usize| v.max(0.0).min(max as f64);
    let col_off = clamp(c0.min(c1).floor(), cols) as usize;
    let row_off = clamp(r0.min(r1).floor(), rows) as usize;
    let col_end = clamp(c0.max(c1).ceil(), cols) as usize;
    let row_end = clamp(r0.max(r1).ceil(), rows) as usize;

    if col_end <= col_off || row_end <= row_off {
        return Err(Error::InvalidBoundingBox(format!(
            "{} selects no pixels",
            bounds
        )));
    }

    Ok(Window {
        col_off,
        row_off,
        width: col_end - col_off,
        height: row_end - row_off,
    })
}

/// Crop one band to the geographic box `request`
pub fn clip_band(raster: &Raster<u16>, request: &BoundingBox) -> Result<Raster<u16>> {
    let crs = raster.require_crs()?;
    let wgs84 = CRS::wgs84();

    let source = BoundingBox::from_tuple(transform_bounds(crs, &wgs84, raster.bounds())?);
    let adjusted = adjust(&source, request);
    if adjusted == source && !source.contains(request) {
        warn!(request = %request, "clip box does not overlap the scene, keeping full extent");
    }

    let native = BoundingBox::from_tuple(transform_bounds(&wgs84, crs, adjusted.to_tuple())?);
    let window = window_for(raster, &native)?;
    debug!(?window, "clip window");
    raster.crop(window)
}

/// A clipped copy of a band set, removed from disk on [`close`](Self::close)
/// or drop unless it was written to a kept directory.
#[derive(Debug)]
pub struct ClippedScene {
    bands: BandSet,
    dir: PathBuf,
    scratch: Option<TempDir>,
}

impl ClippedScene {
    pub fn band_set(&self) -> &BandSet {
        &self.bands
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove the scratch directory. A directory that is already gone is fine.
    pub fn close(mut self) -> Result<()> {
        match self.scratch.take() {
            Some(scratch) => match scratch.close() {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            },
            None => Ok(()),
        }
    }
}

/// Clip every requested band of `set`, plus the QA band, to `request`.
///
/// The metadata sidecar is copied alongside so the clipped set carries
/// the same calibration and cloud cover.
pub fn clip_scene(set: &BandSet, request: &BoundingBox, settings: &Settings) -> Result<ClippedScene> {
    if !request.is_valid() {
        return Err(Error::InvalidBoundingBox(request.to_string()));
    }
    info!(bounds = %request, "clipping");

    let (dir, scratch) = if settings.keep_clipped {
        let dir = set.dir().join("clipped");
        fs::create_dir_all(&dir)?;
        (dir, None)
    } else {
        let mut builder = tempfile::Builder::new();
        builder.prefix("landsat-clipped-");
        let scratch = match &settings.scratch_dir {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        (scratch.path().to_path_buf(), Some(scratch))
    };

    let mut targets = set.designators();
    if set.qa_path().is_some() && !targets.contains(&BandDesignator::Qa) {
        targets.push(BandDesignator::Qa);
    }

    for band in &targets {
        let source_path = set.band_path(*band)?;
        let file_name = source_path
            .file_name()
            .ok_or_else(|| Error::Other(format!("bad band path {}", source_path.display())))?;

        let raster: Raster<u16> = landsat_core::io::read_geotiff(source_path)?;
        let clipped = clip_band(&raster, request)?;
        debug!(band = %band, shape = ?clipped.shape(), "clipped band");
        write_geotiff(&clipped, dir.join(file_name), settings.compression)?;
    }

    match fs::copy(set.metadata_path(), dir.join(set.scene().metadata_file_name())) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("no metadata file to copy into the clipped scene");
        }
        Err(e) => return Err(e.into()),
    }

    let bands = BandSet::open_dir(set.scene().id(), &dir, &set.designators())?;

    Ok(ClippedScene {
        bands,
        dir,
        scratch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use landsat_core::GeoTransform;

    fn bbox(a: f64, b: f64, c: f64, d: f64) -> BoundingBox {
        BoundingBox::new(a, b, c, d)
    }

    #[test]
    fn test_inside_is_unchanged() {
        let source = bbox(-88.0, 30.0, -87.0, 31.0);
        let target = bbox(-87.48, 30.70, -87.43, 30.74);
        assert_eq!(adjust(&source, &target), target);
    }

    #[test]
    fn test_partial_overlap_is_clamped() {
        let source = bbox(-87.6, 30.5, -87.0, 31.0);
        let target = bbox(-87.66, 30.73, -87.58, 31.2);
        assert_eq!(adjust(&source, &target), bbox(-87.6, 30.73, -87.58, 31.0));
    }

    #[test]
    fn test_disjoint_returns_source() {
        let source = bbox(-88.0, 30.0, -87.0, 31.0);
        assert_eq!(adjust(&source, &bbox(-80.0, 30.2, -79.0, 30.4)), source);
        assert_eq!(adjust(&source, &bbox(-87.5, 40.0, -87.4, 41.0)), source);
    }

    #[test]
    fn test_adjust_is_idempotent() {
        let source = bbox(-87.6, 30.5, -87.0, 31.0);
        for target in [
            bbox(-87.66, 30.73, -87.58, 31.2),
            bbox(-87.5, 30.6, -87.1, 30.9),
            bbox(-90.0, 30.6, -89.0, 30.9),
            bbox(-88.0, 29.0, -86.0, 32.0),
        ] {
            let once = adjust(&source, &target);
            assert_eq!(adjust(&source, &once), once);
        }
    }

    #[test]
    fn test_clip_band_window() {
        let mut raster: Raster<u16> = Raster::filled(100, 100, 7);
        raster.set_transform(GeoTransform::new(500_000.0, 3_400_000.0, 30.0, -30.0));
        raster.set_crs(Some(CRS::utm(16, true)));

        let source = BoundingBox::from_tuple(
            transform_bounds(&CRS::utm(16, true), &CRS::wgs84(), raster.bounds()).unwrap(),
        );
        let request = bbox(
            source.min_x + source.width() * 0.25,
            source.min_y + source.height() * 0.25,
            source.min_x + source.width() * 0.75,
            source.min_y + source.height() * 0.75,
        );

        let clipped = clip_band(&raster, &request).unwrap();
        let (rows, cols) = clipped.shape();
        assert!((48..=54).contains(&rows), "rows {}", rows);
        assert!((48..=54).contains(&cols), "cols {}", cols);
        assert!(clipped.transform().origin_x > 500_000.0);
    }

    #[test]
    fn test_clip_band_disjoint_keeps_everything() {
        let mut raster: Raster<u16> = Raster::filled(20, 20, 7);
        raster.set_transform(GeoTransform::new(500_000.0, 3_400_000.0, 30.0, -30.0));
        raster.set_crs(Some(CRS::utm(16, true)));

        let clipped = clip_band(&raster, &bbox(10.0, 10.0, 11.0, 11.0)).unwrap();
        assert_eq!(clipped.shape(), (20, 20));
    }
}
