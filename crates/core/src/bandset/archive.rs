//! Scene archive extraction
//!
//! Landsat scenes are distributed as tarballs compressed with gzip or
//! bzip2. Extraction goes through the `tar` crate first; if that fails the
//! system `tar` binary is tried once before giving up.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use std::process::Command;

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tracing::{info, warn};

use crate::error::{Error, Result};

const ARCHIVE_EXTENSIONS: &[&str] = &["gz", "tgz", "bz", "bz2", "tbz", "tar"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    Gzip,
    Bzip2,
    Plain,
}

fn codec(path: &Path) -> Option<Codec> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "gz" | "tgz" => Some(Codec::Gzip),
        "bz" | "bz2" | "tbz" => Some(Codec::Bzip2),
        "tar" => Some(Codec::Plain),
        _ => None,
    }
}

/// Whether `path` names a scene archive rather than a directory
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ARCHIVE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Extract `src` into the directory `dst`.
///
/// An existing `dst` is reused as-is unless `force` is set. Extraction
/// happens in a staging directory next to `dst` that is renamed into place
/// only once it succeeded, so a failed run never leaves a `dst` behind for
/// the next run to reuse.
pub fn extract(src: &Path, dst: &Path, force: bool) -> Result<()> {
    if dst.is_dir() && !force {
        info!(dir = %dst.display(), "scene already extracted");
        return Ok(());
    }

    info!(archive = %src.display(), "extracting scene archive, this might take some time");

    let parent = dst.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".landsat-extract-")
        .tempdir_in(parent)?;

    if let Err(err) = unpack(src, staging.path()) {
        warn!(error = %err, "archive library failed, retrying with system tar");
        clear_dir(staging.path())?;
        unpack_with_command(src, staging.path()).map_err(|reason| Error::Archive {
            path: src.to_path_buf(),
            reason: format!("{}; system tar: {}", err, reason),
        })?;
    }

    if dst.exists() {
        fs::remove_dir_all(dst)?;
    }
    fs::rename(staging.path(), dst)?;
    Ok(())
}

fn unpack(src: &Path, dst: &Path) -> std::io::Result<()> {
    let file = BufReader::new(File::open(src)?);
    let reader: Box<dyn Read> = match codec(src).unwrap_or(Codec::Plain) {
        Codec::Gzip => Box::new(GzDecoder::new(file)),
        Codec::Bzip2 => Box::new(BzDecoder::new(file)),
        Codec::Plain => Box::new(file),
    };

    tar::Archive::new(reader).unpack(dst)
}

/// Drop whatever a failed attempt left in `dir`
fn clear_dir(dir: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}

fn unpack_with_command(src: &Path, dst: &Path) -> std::result::Result<(), String> {
    let status = Command::new("tar")
        .arg("-xf")
        .arg(src)
        .arg("-C")
        .arg(dst)
        .status()
        .map_err(|e| e.to_string())?;

    if status.success() {
        Ok(())
    } else {
        Err(format!("exited with {}", status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;

    fn build_tar_gz(path: &Path, files: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, flate2::Compression::fast());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_detects_archives() {
        assert!(is_archive(Path::new("LC80030172015001LGN00.tar.bz")));
        assert!(is_archive(Path::new("scene.tar.gz")));
        assert!(is_archive(Path::new("scene.TGZ")));
        assert!(!is_archive(Path::new("LC80030172015001LGN00")));
        assert!(!is_archive(Path::new("scene_B4.TIF")));
    }

    #[test]
    fn test_extract_gzip() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("S1.tar.gz");
        build_tar_gz(&src, &[("S1_B4.TIF", b"band"), ("S1_MTL.txt", b"CLOUD_COVER = 1.0\n")]);

        let dst = dir.path().join("S1");
        extract(&src, &dst, false).unwrap();
        assert!(dst.join("S1_B4.TIF").is_file());
        assert_eq!(fs::read_to_string(dst.join("S1_MTL.txt")).unwrap(), "CLOUD_COVER = 1.0\n");
    }

    #[test]
    fn test_existing_directory_is_reused() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("S2.tar.gz");
        build_tar_gz(&src, &[("S2_B4.TIF", b"fresh")]);

        let dst = dir.path().join("S2");
        fs::create_dir_all(&dst).unwrap();
        extract(&src, &dst, false).unwrap();
        assert!(!dst.join("S2_B4.TIF").exists());

        extract(&src, &dst, true).unwrap();
        assert!(dst.join("S2_B4.TIF").exists());
    }

    #[test]
    fn test_corrupt_archive_is_an_error() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("bad.tar.gz");
        File::create(&src)
            .unwrap()
            .write_all(b"definitely not gzip")
            .unwrap();

        let err = extract(&src, &dir.path().join("bad"), false).unwrap_err();
        assert!(matches!(err, Error::Archive { .. }));
    }

    #[test]
    fn test_failed_extraction_leaves_nothing_to_reuse() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("S3.tar.gz");
        File::create(&src)
            .unwrap()
            .write_all(b"\x1f\x8b truncated")
            .unwrap();
        let dst = dir.path().join("S3");

        assert!(extract(&src, &dst, false).is_err());
        assert!(!dst.exists());
        // only the archive itself is left in the parent
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

        let again = extract(&src, &dst, false).unwrap_err();
        assert!(matches!(again, Error::Archive { .. }));
    }

    #[test]
    fn test_failed_forced_extraction_keeps_previous_directory() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("S4");
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("S4_B4.TIF"), b"old").unwrap();

        let src = dir.path().join("S4.tar.gz");
        fs::write(&src, b"not an archive").unwrap();

        assert!(extract(&src, &dst, true).is_err());
        assert_eq!(fs::read(dst.join("S4_B4.TIF")).unwrap(), b"old");
    }
}
