//! Pack a directory into a `.tar.gz` and remove the original.
//!
//! The archive is written to `<dest>.partial` and renamed into place only
//! after the gzip stream is finished and synced. The source directory is
//! removed only after that rename succeeds; on any earlier failure the
//! partial file is deleted and the source is left untouched.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write archive {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("archive written but {} could not be removed: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to unpack {}: {source}", path.display())]
    Unpack {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub files: usize,
    pub bytes: u64,
}

/// Archive every file under `dir` into `dest` (paths relative to `dir`), then
/// delete `dir`.
pub fn archive(dir: &Path, dest: &Path) -> Result<ArchiveStats, ArchiveError> {
    if !dir.is_dir() {
        return Err(ArchiveError::NotADirectory(dir.to_path_buf()));
    }

    let partial = partial_path(dest);
    let stats = match write_archive(dir, &partial) {
        Ok(stats) => stats,
        Err(err) => {
            let _ = fs::remove_file(&partial);
            return Err(err);
        }
    };

    if let Err(source) = fs::rename(&partial, dest) {
        let _ = fs::remove_file(&partial);
        return Err(ArchiveError::Write {
            path: dest.to_path_buf(),
            source,
        });
    }
    tracing::debug!(archive = %dest.display(), files = stats.files, bytes = stats.bytes, "archive committed");

    fs::remove_dir_all(dir).map_err(|source| ArchiveError::Cleanup {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(stats)
}

/// Extract an archive produced by [`archive`] into `dest`.
pub fn unpack(archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let unpack_err = |source| ArchiveError::Unpack {
        path: archive.to_path_buf(),
        source,
    };
    let file = File::open(archive).map_err(unpack_err)?;
    fs::create_dir_all(dest).map_err(unpack_err)?;
    tar::Archive::new(GzDecoder::new(file))
        .unpack(dest)
        .map_err(unpack_err)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    dest.with_file_name(name)
}

fn write_archive(dir: &Path, partial: &Path) -> Result<ArchiveStats, ArchiveError> {
    let write_err = |source| ArchiveError::Write {
        path: partial.to_path_buf(),
        source,
    };

    let file = File::create(partial).map_err(write_err)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    let mut stats = ArchiveStats::default();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|source| ArchiveError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let rel = path.strip_prefix(dir).unwrap_or(path);
        let mut src = File::open(path).map_err(|source| ArchiveError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let len = src
            .metadata()
            .map_err(|source| ArchiveError::Read {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        builder.append_file(rel, &mut src).map_err(write_err)?;
        stats.files += 1;
        stats.bytes += len;
    }

    let encoder = builder.into_inner().map_err(write_err)?;
    let file = encoder.finish().map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    Ok(stats)
}
