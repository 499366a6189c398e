//! Storage backends for the dense vector matrix.
//!
//! Both backends hold unit vectors row by row and score a query by exact inner
//! product against every row; they differ only in representation and payload
//! format. Which one an index uses is resolved once, from configuration and
//! [`native_available`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::warn;

use ragdb_core::config::NativeMode;
use ragdb_core::error::{Error, Result};

use crate::persist::PersistenceError;

pub mod flat;
#[cfg(feature = "native")]
pub mod native;

pub use flat::FlatBackend;
#[cfg(feature = "native")]
pub use native::NativeBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Native,
    Flat,
    /// Recorded when the payload could not be written; never loadable.
    None,
}

impl BackendKind {
    /// Payload file name inside a persisted index directory.
    pub fn payload_file(self) -> Option<&'static str> {
        match self {
            Self::Native => Some("index.safetensors"),
            Self::Flat => Some("matrix.f32"),
            Self::None => None,
        }
    }

    pub fn is_available(self) -> bool {
        match self {
            Self::Native => native_available(),
            Self::Flat => true,
            Self::None => false,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Native => "native",
            Self::Flat => "flat",
            Self::None => "none",
        })
    }
}

pub trait VectorBackend: Send + Sync {
    fn kind(&self) -> BackendKind;
    fn dim(&self) -> usize;
    /// Number of stored rows.
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool { self.len() == 0 }
    /// Append rows. Callers have already checked every row has length `dim`.
    fn add(&mut self, rows: &[Vec<f32>]) -> Result<()>;
    /// Inner product of `query` with every stored row, in ordinal order.
    fn scores(&self, query: &[f32]) -> Result<Vec<f32>>;
    /// Write the payload file into `dir`.
    fn write_payload(&self, dir: &Path) -> std::result::Result<(), PersistenceError>;
}

/// Whether the tensor backend was compiled into this build.
pub fn native_available() -> bool {
    cfg!(feature = "native")
}

/// Apply the `auto|true|false` selection policy.
pub fn resolve_backend(mode: NativeMode) -> BackendKind {
    match mode {
        NativeMode::Off => BackendKind::Flat,
        NativeMode::Auto if native_available() => BackendKind::Native,
        NativeMode::Auto => BackendKind::Flat,
        NativeMode::On if native_available() => BackendKind::Native,
        NativeMode::On => {
            warn!("native backend requested but not compiled in, using flat backend");
            BackendKind::Flat
        }
    }
}

pub(crate) fn new_backend(kind: BackendKind, dim: usize) -> Result<Box<dyn VectorBackend>> {
    match kind {
        BackendKind::Flat => Ok(Box::new(FlatBackend::new(dim))),
        #[cfg(feature = "native")]
        BackendKind::Native => Ok(Box::new(NativeBackend::new(dim))),
        other => Err(Error::Operation(format!("backend '{other}' is not available"))),
    }
}

pub(crate) fn read_backend(
    kind: BackendKind,
    dir: &Path,
    dim: usize,
    count: usize,
) -> std::result::Result<Box<dyn VectorBackend>, PersistenceError> {
    match kind {
        BackendKind::Flat => Ok(Box::new(FlatBackend::read(dir, dim, count)?)),
        #[cfg(feature = "native")]
        BackendKind::Native => Ok(Box::new(NativeBackend::read(dir, dim, count)?)),
        other => Err(PersistenceError::BackendUnavailable(other)),
    }
}

/// Write `bytes` next to `path` and rename into place.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = tmp_path(path);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

pub(crate) fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
