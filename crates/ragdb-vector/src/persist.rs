//! On-disk layout of a persisted index directory:
//!
//! - `manifest.json`: `{"backend", "dim", "count"}`
//! - `metadata.json`: the stored documents in ordinal order
//! - payload: `index.safetensors` (native) or `matrix.f32` (flat), only when
//!   `count > 0`
//!
//! The payload and metadata are written before the manifest, each through a
//! temp file and rename, so a manifest never names data that is not on disk.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use ragdb_core::types::Document;

use crate::backend::{read_backend, write_atomic, BackendKind};
use crate::index::VectorIndex;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("missing {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to access {}: {source}", .path.display())]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse { path: PathBuf, #[source] source: serde_json::Error },

    #[error("backend '{0}' is not available in this build")]
    BackendUnavailable(BackendKind),

    #[error("inconsistent index: {0}")]
    Inconsistent(String),

    #[error("payload error: {0}")]
    Payload(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub backend: BackendKind,
    pub dim: Option<usize>,
    pub count: usize,
}

impl VectorIndex {
    /// Persist into `dir`, returning the backend recorded in the manifest.
    ///
    /// A payload write failure is logged and recorded as backend `none`; the
    /// metadata is still written so the documents stay recoverable.
    pub fn save(&self, dir: &Path) -> Result<BackendKind, PersistenceError> {
        fs::create_dir_all(dir).map_err(|e| PersistenceError::Io { path: dir.to_path_buf(), source: e })?;

        let mut recorded = self.kind;
        if let Some(backend) = self.backend.as_ref().filter(|_| self.has_data()) {
            if let Err(e) = backend.write_payload(dir) {
                warn!(dir = %dir.display(), error = %e, "index payload not written, recording backend none");
                recorded = BackendKind::None;
            }
        }

        write_json(&dir.join(METADATA_FILE), &self.documents)?;
        let manifest = Manifest { backend: recorded, dim: self.dim, count: self.len() };
        write_json(&dir.join(MANIFEST_FILE), &manifest)?;
        info!(dir = %dir.display(), backend = %recorded, count = manifest.count, "index saved");
        Ok(recorded)
    }

    /// Load a persisted index, reporting why it cannot be used.
    pub fn try_load(dir: &Path) -> Result<Self, PersistenceError> {
        let manifest = read_manifest(dir)?;
        let documents = read_metadata(dir)?;
        if manifest.count != documents.len() {
            return Err(PersistenceError::Inconsistent(format!(
                "manifest count {} but {} metadata entries",
                manifest.count,
                documents.len()
            )));
        }
        if !manifest.backend.is_available() {
            return Err(PersistenceError::BackendUnavailable(manifest.backend));
        }

        let backend = if manifest.count > 0 {
            let dim = manifest
                .dim
                .filter(|d| *d > 0)
                .ok_or_else(|| PersistenceError::Inconsistent("manifest lists documents but no dimension".into()))?;
            Some(read_backend(manifest.backend, dir, dim, manifest.count)?)
        } else {
            None
        };

        Ok(Self { kind: manifest.backend, dim: manifest.dim, backend, documents })
    }

    /// Best-effort load: `None` means start from an empty index.
    pub fn load(dir: &Path) -> Option<Self> {
        match Self::try_load(dir) {
            Ok(index) => {
                info!(dir = %dir.display(), backend = %index.kind, count = index.len(), "index loaded");
                Some(index)
            }
            Err(PersistenceError::Missing(path)) => {
                info!(missing = %path.display(), "no persisted index");
                None
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "persisted index unusable");
                None
            }
        }
    }
}

pub fn read_manifest(dir: &Path) -> Result<Manifest, PersistenceError> {
    read_json(&dir.join(MANIFEST_FILE))
}

/// The stored documents alone, for recovery when the payload is unusable.
pub fn read_metadata(dir: &Path) -> Result<Vec<Document>, PersistenceError> {
    read_json(&dir.join(METADATA_FILE))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PersistenceError> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PersistenceError::Missing(path.to_path_buf()),
        _ => PersistenceError::Io { path: path.to_path_buf(), source: e },
    })?;
    serde_json::from_str(&text).map_err(|e| PersistenceError::Parse { path: path.to_path_buf(), source: e })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| PersistenceError::Parse { path: path.to_path_buf(), source: e })?;
    write_atomic(path, &bytes).map_err(|e| PersistenceError::Io { path: path.to_path_buf(), source: e })
}
