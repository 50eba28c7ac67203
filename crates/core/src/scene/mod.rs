//! Scene identity and acquisition metadata

mod metadata;

pub use metadata::{Calibration, SceneMetadata};

use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// A Landsat scene: identifier, the satellite/path/row encoded in it, and
/// the metadata read from its `_MTL.txt` sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    id: String,
    satellite: Option<String>,
    path: Option<String>,
    row: Option<String>,
    metadata: SceneMetadata,
}

impl Scene {
    /// Build a scene from its identifier.
    ///
    /// Two identifier layouts are understood:
    ///
    /// ```text
    /// LC81990242015046LGN00              pre-collection: sat L8, path 199, row 024
    /// LC08_L1TP_044034_20170105_..._T1   collection:     sat L8, path 044, row 034
    /// ```
    ///
    /// Anything else keeps the id but leaves satellite, path and row unset.
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let (satellite, path, row) = match decode_collection_id(&id).or_else(|| decode_legacy_id(&id)) {
            Some((sat, path, row)) => (Some(sat), Some(path), Some(row)),
            None => (None, None, None),
        };

        Self {
            id,
            satellite,
            path,
            row,
            metadata: SceneMetadata::default(),
        }
    }

    /// Scene named after a file or directory: the file name up to its first `.`
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Other(format!("no scene name in {}", path.display())))?;
        let id = name.split('.').next().unwrap_or(name);
        if id.is_empty() {
            return Err(Error::Other(format!("no scene name in {}", path.display())));
        }
        Ok(Self::from_id(id))
    }

    /// Attach metadata read from the scene's sidecar
    pub fn with_metadata(mut self, metadata: SceneMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Satellite code such as `L8`
    pub fn satellite(&self) -> Option<&str> {
        self.satellite.as_deref()
    }

    /// WRS path, three digits
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// WRS row, three digits
    pub fn row(&self) -> Option<&str> {
        self.row.as_deref()
    }

    pub fn metadata(&self) -> &SceneMetadata {
        &self.metadata
    }

    /// Name of the metadata sidecar file
    pub fn metadata_file_name(&self) -> String {
        format!("{}_MTL.txt", self.id)
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

fn decode_legacy_id(id: &str) -> Option<(String, String, String)> {
    if id.len() != 21 || !id.is_ascii() || !id.starts_with('L') {
        return None;
    }
    let digits = &id[2..16];
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((
        format!("L{}", &id[2..3]),
        id[3..6].to_string(),
        id[6..9].to_string(),
    ))
}

fn decode_collection_id(id: &str) -> Option<(String, String, String)> {
    let mut parts = id.split('_');
    let sensor = parts.next()?;
    let _level = parts.next()?;
    let path_row = parts.next()?;

    if sensor.len() != 4 || !sensor.starts_with('L') {
        return None;
    }
    let mission: u8 = sensor[2..].parse().ok()?;
    if path_row.len() != 6 || !path_row.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some((
        format!("L{}", mission),
        path_row[0..3].to_string(),
        path_row[3..6].to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_legacy_id() {
        let scene = Scene::from_id("LC81990242015046LGN00");
        assert_eq!(scene.satellite(), Some("L8"));
        assert_eq!(scene.path(), Some("199"));
        assert_eq!(scene.row(), Some("024"));
    }

    #[test]
    fn test_collection_id() {
        let scene = Scene::from_id("LC08_L1TP_044034_20170105_20170218_01_T1");
        assert_eq!(scene.satellite(), Some("L8"));
        assert_eq!(scene.path(), Some("044"));
        assert_eq!(scene.row(), Some("034"));
    }

    #[test]
    fn test_unknown_id_keeps_name() {
        let scene = Scene::from_id("my_scene");
        assert_eq!(scene.id(), "my_scene");
        assert!(scene.satellite().is_none());
        assert!(scene.path().is_none());
    }

    #[test]
    fn test_from_archive_path() {
        let path = PathBuf::from("/data/LC80030172015001LGN00.tar.bz");
        let scene = Scene::from_path(&path).unwrap();
        assert_eq!(scene.id(), "LC80030172015001LGN00");
        assert_eq!(scene.metadata_file_name(), "LC80030172015001LGN00_MTL.txt");
    }

    #[test]
    fn test_from_directory_path() {
        let scene = Scene::from_path(Path::new("scenes/LC80030172015001LGN00")).unwrap();
        assert_eq!(scene.id(), "LC80030172015001LGN00");
        assert!(Scene::from_path(Path::new("/")).is_err());
    }
}
