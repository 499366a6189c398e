use candle_core::{DType, Device, Tensor};
use std::collections::HashMap;
use std::path::Path;

use ragdb_core::error::{Error, Result};

use super::{tmp_path, BackendKind, VectorBackend};
use crate::persist::PersistenceError;

const MATRIX_TENSOR: &str = "vectors";

fn op_err(e: candle_core::Error) -> Error {
    Error::Operation(format!("native backend: {e}"))
}

fn payload_err(e: candle_core::Error) -> PersistenceError {
    PersistenceError::Payload(e.to_string())
}

/// Dense `(count, dim)` f32 tensor on the CPU device; scoring is one matmul.
pub struct NativeBackend {
    dim: usize,
    device: Device,
    matrix: Option<Tensor>,
}

impl NativeBackend {
    pub fn new(dim: usize) -> Self {
        Self { dim, device: Device::Cpu, matrix: None }
    }

    pub fn read(dir: &Path, dim: usize, count: usize) -> std::result::Result<Self, PersistenceError> {
        let path = dir.join(BackendKind::Native.payload_file().unwrap_or_default());
        if !path.exists() {
            return Err(PersistenceError::Missing(path));
        }
        let device = Device::Cpu;
        let mut tensors = candle_core::safetensors::load(&path, &device).map_err(payload_err)?;
        let matrix = tensors
            .remove(MATRIX_TENSOR)
            .ok_or_else(|| PersistenceError::Payload(format!("{} has no '{MATRIX_TENSOR}' tensor", path.display())))?
            .to_dtype(DType::F32)
            .map_err(payload_err)?;
        let shape = matrix.dims2().map_err(payload_err)?;
        if shape != (count, dim) {
            return Err(PersistenceError::Inconsistent(format!(
                "{} has shape {shape:?}, expected ({count}, {dim})",
                path.display()
            )));
        }
        Ok(Self { dim, device, matrix: Some(matrix) })
    }
}

impl VectorBackend for NativeBackend {
    fn kind(&self) -> BackendKind { BackendKind::Native }
    fn dim(&self) -> usize { self.dim }
    fn len(&self) -> usize {
        self.matrix.as_ref().and_then(|m| m.dim(0).ok()).unwrap_or(0)
    }

    fn add(&mut self, rows: &[Vec<f32>]) -> Result<()> {
        if rows.is_empty() { return Ok(()); }
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        let block = Tensor::from_vec(flat, (rows.len(), self.dim), &self.device).map_err(op_err)?;
        let next = match &self.matrix {
            Some(existing) => Tensor::cat(&[existing, &block], 0).map_err(op_err)?,
            None => block,
        };
        self.matrix = Some(next);
        Ok(())
    }

    fn scores(&self, query: &[f32]) -> Result<Vec<f32>> {
        let Some(matrix) = &self.matrix else { return Ok(Vec::new()) };
        let q = Tensor::from_slice(query, (self.dim, 1), &self.device).map_err(op_err)?;
        matrix
            .matmul(&q)
            .and_then(|s| s.squeeze(1))
            .and_then(|s| s.to_vec1::<f32>())
            .map_err(op_err)
    }

    fn write_payload(&self, dir: &Path) -> std::result::Result<(), PersistenceError> {
        let Some(matrix) = &self.matrix else { return Ok(()) };
        let path = dir.join(BackendKind::Native.payload_file().unwrap_or_default());
        let tmp = tmp_path(&path);
        let tensors = HashMap::from([(MATRIX_TENSOR.to_string(), matrix.clone())]);
        candle_core::safetensors::save(&tensors, &tmp).map_err(payload_err)?;
        std::fs::rename(&tmp, &path).map_err(|e| PersistenceError::Io { path, source: e })
    }
}
