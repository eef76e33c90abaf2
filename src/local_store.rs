//! Small key/value store for JSON documents under the app root.
//!
//! One file per key (`<key>.json`), written atomically. Keys are the same
//! names the web client used for its local storage.

use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};

use crate::{app_dirs, fs_ops};

/// Persisted analysis history, newest first.
pub const HISTORY_KEY: &str = "danceAnalysisHistory";
/// Backend result of an analysis that finished and has not been picked up yet.
pub const CURRENT_RESULTS_KEY: &str = "currentAnalysisResults";
/// Error message of an analysis that failed and has not been picked up yet.
pub const ANALYSIS_ERROR_KEY: &str = "analysisError";

/// Errors raised by [`LocalStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Local storage directory unavailable: {0}")]
    Dir(#[from] app_dirs::AppDirError),
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Stored value at {path} is not valid JSON: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

/// Directory-backed JSON store.
#[derive(Clone, Debug)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Open the store in the default `storage` directory of the app root.
    pub fn open_default() -> Result<Self, StoreError> {
        Ok(Self::at(app_dirs::storage_dir()?))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read and decode a value; `Ok(None)` when the key was never set.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let path = self.path_for(key)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Decode { path, source })
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        fs_ops::atomic_write(&path, &bytes).map_err(|source| StoreError::Write { path, source })
    }

    /// Delete a key. Removing a missing key is not an error.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove { path, source }),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).map(|path| path.is_file()).unwrap_or(false)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}
