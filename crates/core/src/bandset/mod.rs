//! Locating and opening the band files of one scene

mod archive;

pub use archive::{extract, is_archive};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use glob::Pattern;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::io::read_geotiff;
use crate::raster::Raster;
use crate::scene::{Scene, SceneMetadata};

/// Which file of a scene bundle to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BandDesignator {
    /// Spectral band 1 to 11
    Band(u8),
    /// Quality assessment flags
    Qa,
    /// Metadata sidecar
    Mtl,
    /// Angle coefficients sidecar
    Ang,
}

impl BandDesignator {
    /// Panchromatic band of Landsat 8
    pub const PAN: BandDesignator = BandDesignator::Band(8);

    pub fn band(number: u8) -> Result<Self> {
        if (1..=11).contains(&number) {
            Ok(BandDesignator::Band(number))
        } else {
            Err(Error::InvalidBand(number.to_string()))
        }
    }

    /// Spectral band number, if this is one
    pub fn number(&self) -> Option<u8> {
        match self {
            BandDesignator::Band(n) => Some(*n),
            _ => None,
        }
    }

    /// Glob patterns, relative to the scene directory, that name this file
    fn patterns(&self, scene: &str) -> Vec<String> {
        let scene = Pattern::escape(scene);
        match self {
            BandDesignator::Band(n) => vec![format!("{}_B{}.*", scene, n)],
            BandDesignator::Qa => vec![
                format!("{}_BQA.*", scene),
                format!("{}_B QA.*", scene),
            ],
            BandDesignator::Mtl => vec![format!("{}_MTL.*", scene)],
            BandDesignator::Ang => vec![format!("{}_ANG.*", scene)],
        }
    }
}

impl fmt::Display for BandDesignator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandDesignator::Band(n) => write!(f, "{}", n),
            BandDesignator::Qa => write!(f, "QA"),
            BandDesignator::Mtl => write!(f, "MTL"),
            BandDesignator::Ang => write!(f, "ANG"),
        }
    }
}

impl FromStr for BandDesignator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.to_ascii_uppercase().as_str() {
            "QA" | "BQA" => Ok(BandDesignator::Qa),
            "MTL" => Ok(BandDesignator::Mtl),
            "ANG" => Ok(BandDesignator::Ang),
            other => other
                .parse::<u8>()
                .map_err(|_| Error::InvalidBand(s.to_string()))
                .and_then(BandDesignator::band),
        }
    }
}

/// Split a compact band list such as `432` or `10114` into designators.
///
/// Tokens are `10`, `11`, `QA` or a single digit, matched left to right.
/// Commas and whitespace between tokens are ignored.
pub fn parse_band_list(input: &str) -> Result<Vec<BandDesignator>> {
    let mut bands = Vec::new();
    let mut rest = input.trim();

    while let Some(c) = rest.chars().next() {
        if c == ',' || c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
            continue;
        }
        let (token, tail) = if rest.starts_with("10") || rest.starts_with("11") {
            rest.split_at(2)
        } else if rest.get(..2).map_or(false, |t| t.eq_ignore_ascii_case("qa")) {
            rest.split_at(2)
        } else if c.is_ascii_digit() {
            rest.split_at(1)
        } else {
            return Err(Error::InvalidBand(rest.to_string()));
        };
        bands.push(token.parse()?);
        rest = tail;
    }

    if bands.is_empty() {
        return Err(Error::InvalidBand(input.to_string()));
    }
    Ok(bands)
}

/// One opened band file
#[derive(Debug, Clone)]
pub struct BandFile {
    pub designator: BandDesignator,
    pub path: PathBuf,
    pub raster: Raster<u16>,
}

/// The files of one scene needed for a band combination.
///
/// Every requested band is resolved to exactly one file when the set is
/// opened, so a missing band fails before any pixel is read.
#[derive(Debug, Clone)]
pub struct BandSet {
    scene: Scene,
    dir: PathBuf,
    bands: Vec<(BandDesignator, PathBuf)>,
    qa: Option<PathBuf>,
}

impl BandSet {
    /// Open a scene given as a directory or a compressed archive.
    ///
    /// Archives are extracted into a sibling directory named after the
    /// scene; see [`extract`] for reuse rules.
    pub fn open(scene_path: &Path, bands: &[BandDesignator], settings: &Settings) -> Result<Self> {
        let scene = Scene::from_path(scene_path)?;

        let dir = if is_archive(scene_path) {
            let parent = scene_path.parent().unwrap_or_else(|| Path::new("."));
            let dir = parent.join(scene.id());
            extract(scene_path, &dir, settings.force_unzip)?;
            dir
        } else {
            scene_path.to_path_buf()
        };

        Self::open_dir(scene.id(), &dir, bands)
    }

    /// Open an already extracted scene directory
    pub fn open_dir(scene_id: &str, dir: &Path, bands: &[BandDesignator]) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("scene directory {} does not exist", dir.display()),
            )));
        }

        let scene = Scene::from_id(scene_id);
        let metadata = SceneMetadata::read(&dir.join(scene.metadata_file_name()))?;
        let scene = scene.with_metadata(metadata);

        let resolved = bands
            .iter()
            .map(|b| locate(dir, scene.id(), *b).map(|path| (*b, path)))
            .collect::<Result<Vec<_>>>()?;

        let qa = match locate(dir, scene.id(), BandDesignator::Qa) {
            Ok(path) => Some(path),
            Err(Error::FileDoesNotExist { .. }) => None,
            Err(e) => return Err(e),
        };

        info!(
            scene = scene.id(),
            bands = %bands.iter().map(|b| b.to_string()).collect::<Vec<_>>().join("-"),
            qa = qa.is_some(),
            "opened band set"
        );

        Ok(Self {
            scene,
            dir: dir.to_path_buf(),
            bands: resolved,
            qa,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Directory holding the band files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Requested designators, in request order
    pub fn designators(&self) -> Vec<BandDesignator> {
        self.bands.iter().map(|(b, _)| *b).collect()
    }

    /// Path of a requested band
    pub fn band_path(&self, band: BandDesignator) -> Result<&Path> {
        if band == BandDesignator::Qa {
            return self.qa_path().ok_or_else(|| self.missing(band));
        }
        self.bands
            .iter()
            .find(|(b, _)| *b == band)
            .map(|(_, p)| p.as_path())
            .ok_or_else(|| self.missing(band))
    }

    /// Quality band, when the bundle has one
    pub fn qa_path(&self) -> Option<&Path> {
        self.qa.as_deref()
    }

    /// Path of the metadata sidecar (it may not exist)
    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(self.scene.metadata_file_name())
    }

    /// Spectral bands 1 to 11 present in the scene directory, requested or not
    pub fn available_bands(&self) -> Result<Vec<(BandDesignator, PathBuf)>> {
        let mut found = Vec::new();
        for n in 1..=11 {
            let band = BandDesignator::Band(n);
            match locate(&self.dir, self.scene.id(), band) {
                Ok(path) => found.push((band, path)),
                Err(Error::FileDoesNotExist { matches: 0, .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }

    /// Read one band from disk
    pub fn read_band(&self, band: BandDesignator) -> Result<BandFile> {
        let path = self.band_path(band)?.to_path_buf();
        debug!(band = %band, path = %path.display(), "reading band");
        let raster = read_geotiff::<u16, _>(&path)?;
        raster.require_crs()?;
        Ok(BandFile {
            designator: band,
            path,
            raster,
        })
    }

    /// Read every requested band, in request order
    pub fn read_all(&self) -> Result<Vec<BandFile>> {
        self.bands.iter().map(|(b, _)| self.read_band(*b)).collect()
    }

    /// Read the quality band if present
    pub fn read_qa(&self) -> Result<Option<Raster<u16>>> {
        match self.qa_path() {
            Some(path) => Ok(Some(read_geotiff(path)?)),
            None => Ok(None),
        }
    }

    fn missing(&self, band: BandDesignator) -> Error {
        Error::FileDoesNotExist {
            scene: self.scene.id().to_string(),
            band: band.to_string(),
            matches: 0,
        }
    }
}

/// Resolve a designator to exactly one file in `dir`
fn locate(dir: &Path, scene: &str, band: BandDesignator) -> Result<PathBuf> {
    let base = Pattern::escape(&dir.to_string_lossy());
    let mut matches = Vec::new();

    for pattern in band.patterns(scene) {
        let full = format!("{}/{}", base, pattern);
        for entry in glob::glob(&full)? {
            match entry {
                Ok(path) => matches.push(path),
                Err(e) => return Err(Error::Io(e.into_error())),
            }
        }
    }

    match matches.len() {
        1 => Ok(matches.remove(0)),
        n => Err(Error::FileDoesNotExist {
            scene: scene.to_string(),
            band: band.to_string(),
            matches: n,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::CRS;
    use crate::io::{write_geotiff, Compression};
    use crate::raster::GeoTransform;
    use std::fs;
    use tempfile::TempDir;

    const SCENE: &str = "LC80030172015001LGN00";

    fn write_band(dir: &Path, name: &str) {
        let mut raster: Raster<u16> = Raster::filled(4, 4, 1000);
        raster.set_transform(GeoTransform::new(500_000.0, 4_000_000.0, 30.0, -30.0));
        raster.set_crs(Some(CRS::utm(17, true)));
        write_geotiff(&raster, dir.join(name), Compression::Uncompressed).unwrap();
    }

    #[test]
    fn test_parse_band_list() {
        use BandDesignator::*;
        assert_eq!(parse_band_list("432").unwrap(), vec![Band(4), Band(3), Band(2)]);
        assert_eq!(parse_band_list("10114").unwrap(), vec![Band(10), Band(11), Band(4)]);
        assert_eq!(parse_band_list("45QA").unwrap(), vec![Band(4), Band(5), Qa]);
        assert_eq!(parse_band_list("4, 3, 2").unwrap(), vec![Band(4), Band(3), Band(2)]);
        assert!(parse_band_list("40").is_err());
        assert!(parse_band_list("4x").is_err());
        assert!(parse_band_list("").is_err());
    }

    #[test]
    fn test_designator_from_str() {
        assert_eq!("qa".parse::<BandDesignator>().unwrap(), BandDesignator::Qa);
        assert_eq!("11".parse::<BandDesignator>().unwrap(), BandDesignator::Band(11));
        assert!("12".parse::<BandDesignator>().is_err());
        assert_eq!(BandDesignator::PAN.to_string(), "8");
    }

    #[test]
    fn test_open_and_read() {
        let dir = TempDir::new().unwrap();
        for b in ["B4", "B3", "B2", "BQA"] {
            write_band(dir.path(), &format!("{}_{}.TIF", SCENE, b));
        }
        fs::write(dir.path().join(format!("{}_MTL.txt", SCENE)), "CLOUD_COVER = 12.5\n").unwrap();

        let bands = parse_band_list("432").unwrap();
        let set = BandSet::open_dir(SCENE, dir.path(), &bands).unwrap();
        assert_eq!(set.scene().metadata().cloud_cover, Some(12.5));
        assert!(set.qa_path().is_some());

        let files = set.read_all().unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].designator, BandDesignator::Band(4));
        assert_eq!(files[0].raster.shape(), (4, 4));
    }

    #[test]
    fn test_band_one_does_not_match_band_ten() {
        let dir = TempDir::new().unwrap();
        write_band(dir.path(), &format!("{}_B10.TIF", SCENE));

        let err = BandSet::open_dir(SCENE, dir.path(), &[BandDesignator::Band(1)]).unwrap_err();
        assert!(matches!(err, Error::FileDoesNotExist { matches: 0, .. }));
    }

    #[test]
    fn test_ambiguous_band_is_rejected() {
        let dir = TempDir::new().unwrap();
        write_band(dir.path(), &format!("{}_B4.TIF", SCENE));
        write_band(dir.path(), &format!("{}_B4.tif.bak", SCENE));

        let err = BandSet::open_dir(SCENE, dir.path(), &[BandDesignator::Band(4)]).unwrap_err();
        assert!(matches!(err, Error::FileDoesNotExist { matches: 2, .. }));
    }

    #[test]
    fn test_qa_with_space_spelling() {
        let dir = TempDir::new().unwrap();
        write_band(dir.path(), &format!("{}_B4.TIF", SCENE));
        write_band(dir.path(), &format!("{}_B QA.TIF", SCENE));

        let set = BandSet::open_dir(SCENE, dir.path(), &[BandDesignator::Band(4)]).unwrap();
        assert!(set.read_qa().unwrap().is_some());
    }

    #[test]
    fn test_available_bands() {
        let dir = TempDir::new().unwrap();
        for b in ["B1", "B10", "B4", "BQA"] {
            write_band(dir.path(), &format!("{}_{}.TIF", SCENE, b));
        }

        let set = BandSet::open_dir(SCENE, dir.path(), &[]).unwrap();
        let found: Vec<_> = set.available_bands().unwrap().into_iter().map(|(b, _)| b).collect();
        assert_eq!(
            found,
            vec![BandDesignator::Band(1), BandDesignator::Band(4), BandDesignator::Band(10)]
        );
    }

    #[test]
    fn test_open_missing_directory() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::with_output_dir(dir.path());
        let result = BandSet::open(&dir.path().join(SCENE), &[BandDesignator::Band(4)], &settings);
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
