//! Store configuration
//!
//! Resolves where the cache database lives and which bucket it uses. The
//! default location is XDG-compliant (`~/.cache/remember/memory.db` on Linux).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// Default file name of the backing database
pub const DEFAULT_DB_FILE: &str = "memory.db";

/// Default bucket holding every entry
pub const DEFAULT_BUCKET: &str = "memory";

/// Location and namespace of a cache store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Path of the backing database file
    pub path: PathBuf,
    /// Bucket all entries are written to
    pub bucket: String,
}

impl StoreConfig {
    /// Creates a config for a database at `path` in the default bucket
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }

    /// Replaces the bucket name
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Returns the XDG cache directory for this crate, if a home directory exists
    pub fn default_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "remember").map(|dirs| dirs.cache_dir().to_path_buf())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for StoreConfig {
    /// Uses the XDG cache directory, or the working directory when none can be
    /// determined (e.g. no home directory in CI)
    fn default() -> Self {
        let path = Self::default_dir()
            .map(|dir| dir.join(DEFAULT_DB_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));
        Self::at(path)
    }
}
