//! Key-value storage for cached pipeline artifacts.
//!
//! A key is derived from the image paths it describes. Whether an artifact
//! exists is the only validity signal; nothing is checked against the source
//! images.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::AlignError;

const INTEREST_POINT_SUFFIX: &str = "ipts";
const MATCH_SUFFIX: &str = "match";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    /// Interest points of one image.
    InterestPoints(PathBuf),
    /// Deduplicated matches of an ordered image pair.
    Matches(PathBuf, PathBuf),
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over the absolute paths, each followed by a zero byte.
///
/// Names built from it are persisted, so the digest must never change.
fn path_digest(paths: &[&PathBuf]) -> u64 {
    let mut hash = FNV_OFFSET;
    for path in paths {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        for &byte in absolute.as_os_str().as_encoded_bytes().iter().chain(&[0u8]) {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

impl ArtifactKey {
    pub fn interest_points(image: impl Into<PathBuf>) -> ArtifactKey {
        ArtifactKey::InterestPoints(image.into())
    }

    pub fn matches(left: impl Into<PathBuf>, right: impl Into<PathBuf>) -> ArtifactKey {
        ArtifactKey::Matches(left.into(), right.into())
    }

    /// File name of the artifact, without directory.
    pub fn file_name(&self) -> String {
        match self {
            ArtifactKey::InterestPoints(image) => {
                format!("{}.{}", stem(image), INTEREST_POINT_SUFFIX)
            }
            ArtifactKey::Matches(left, right) => {
                format!("{}__{}.{}", stem(left), stem(right), MATCH_SUFFIX)
            }
        }
    }

    /// File name that stays unique per full input paths, used inside a shared
    /// cache directory where images from many directories meet.
    pub fn qualified_file_name(&self) -> String {
        match self {
            ArtifactKey::InterestPoints(image) => format!(
                "{}-{:016x}.{}",
                stem(image),
                path_digest(&[image]),
                INTEREST_POINT_SUFFIX
            ),
            ArtifactKey::Matches(left, right) => format!(
                "{}__{}-{:016x}.{}",
                stem(left),
                stem(right),
                path_digest(&[left, right]),
                MATCH_SUFFIX
            ),
        }
    }

    /// Directory the artifact lives in when no cache directory is set.
    fn home_dir(&self) -> &Path {
        let anchor = match self {
            ArtifactKey::InterestPoints(image) => image,
            ArtifactKey::Matches(left, _) => left,
        };
        anchor.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// Backing store for artifacts.
pub trait ArtifactStore {
    /// Where the artifact for `key` lives, used in diagnostics.
    fn locate(&self, key: &ArtifactKey) -> PathBuf;

    fn exists(&self, key: &ArtifactKey) -> bool;

    fn read(&self, key: &ArtifactKey) -> Result<Vec<u8>, AlignError>;

    /// Stores a new artifact. Fails instead of replacing an existing one.
    fn write(&mut self, key: &ArtifactKey, bytes: &[u8]) -> Result<(), AlignError>;
}

/// Artifacts as files, next to the images or in a shared directory.
#[derive(Debug, Clone, Default)]
pub struct FsStore {
    cache_dir: Option<PathBuf>,
}

impl FsStore {
    pub fn new() -> FsStore {
        FsStore::default()
    }

    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> FsStore {
        FsStore {
            cache_dir: Some(cache_dir.into()),
        }
    }

    /// `<image dir>/<plain name>` without a cache directory,
    /// `<cache dir>/<qualified name>` with one.
    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => dir.join(key.qualified_file_name()),
            None => key.home_dir().join(key.file_name()),
        }
    }
}

impl ArtifactStore for FsStore {
    fn locate(&self, key: &ArtifactKey) -> PathBuf {
        self.path_for(key)
    }

    fn exists(&self, key: &ArtifactKey) -> bool {
        self.path_for(key).is_file()
    }

    fn read(&self, key: &ArtifactKey) -> Result<Vec<u8>, AlignError> {
        let path = self.path_for(key);
        std::fs::read(&path).map_err(|e| AlignError::unreadable(path, e))
    }

    fn write(&mut self, key: &ArtifactKey, bytes: &[u8]) -> Result<(), AlignError> {
        let path = self.path_for(key);
        let write_err = |source| AlignError::WriteFailed {
            path: path.clone(),
            source,
        };
        if let Some(dir) = &self.cache_dir {
            std::fs::create_dir_all(dir).map_err(write_err)?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(write_err)?;
        file.write_all(bytes).map_err(write_err)?;
        log::trace!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

/// In-process store, mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<ArtifactKey, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ArtifactStore for MemoryStore {
    fn locate(&self, key: &ArtifactKey) -> PathBuf {
        PathBuf::from(key.file_name())
    }

    fn exists(&self, key: &ArtifactKey) -> bool {
        self.entries.contains_key(key)
    }

    fn read(&self, key: &ArtifactKey) -> Result<Vec<u8>, AlignError> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| AlignError::unreadable(self.locate(key), "no such artifact"))
    }

    fn write(&mut self, key: &ArtifactKey, bytes: &[u8]) -> Result<(), AlignError> {
        if self.entries.contains_key(key) {
            return Err(AlignError::WriteFailed {
                path: self.locate(key),
                source: std::io::Error::from(std::io::ErrorKind::AlreadyExists),
            });
        }
        self.entries.insert(key.clone(), bytes.to_vec());
        Ok(())
    }
}
