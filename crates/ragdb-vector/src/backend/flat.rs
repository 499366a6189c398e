use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use ragdb_core::error::Result;
use ragdb_embed::dot;

use super::{write_atomic, BackendKind, VectorBackend};
use crate::persist::PersistenceError;

/// Pure row-major matrix. Payload: `count × dim` little-endian `f32`s.
#[derive(Debug, Clone)]
pub struct FlatBackend {
    dim: usize,
    data: Vec<f32>,
}

impl FlatBackend {
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    pub fn read(dir: &Path, dim: usize, count: usize) -> std::result::Result<Self, PersistenceError> {
        let path = dir.join(BackendKind::Flat.payload_file().unwrap_or_default());
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PersistenceError::Missing(path.clone()),
            _ => PersistenceError::Io { path: path.clone(), source: e },
        })?;
        let expected = count
            .checked_mul(dim)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| PersistenceError::Inconsistent(format!("{count} rows of dimension {dim} overflow")))?;
        if bytes.len() != expected {
            return Err(PersistenceError::Inconsistent(format!(
                "{} holds {} bytes, expected {expected}",
                path.display(),
                bytes.len()
            )));
        }
        let data = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(Self { dim, data })
    }
}

impl VectorBackend for FlatBackend {
    fn kind(&self) -> BackendKind { BackendKind::Flat }
    fn dim(&self) -> usize { self.dim }
    fn len(&self) -> usize {
        if self.dim == 0 { 0 } else { self.data.len() / self.dim }
    }

    fn add(&mut self, rows: &[Vec<f32>]) -> Result<()> {
        self.data.reserve(rows.len() * self.dim);
        for row in rows { self.data.extend_from_slice(row); }
        Ok(())
    }

    fn scores(&self, query: &[f32]) -> Result<Vec<f32>> {
        if self.dim == 0 { return Ok(Vec::new()); }
        Ok(self.data.chunks_exact(self.dim).map(|row| dot(row, query)).collect())
    }

    fn write_payload(&self, dir: &Path) -> std::result::Result<(), PersistenceError> {
        let path = dir.join(BackendKind::Flat.payload_file().unwrap_or_default());
        let mut bytes = Vec::with_capacity(self.data.len() * 4);
        for x in &self.data { bytes.extend_from_slice(&x.to_le_bytes()); }
        write_atomic(&path, &bytes).map_err(|e| PersistenceError::Io { path, source: e })
    }
}
