use tracing::debug;

use ragdb_core::config::NativeMode;
use ragdb_core::error::{Error, Result};
use ragdb_core::types::{Citation, Document};
use ragdb_embed::normalized;

use crate::backend::{new_backend, resolve_backend, BackendKind, VectorBackend};

/// Exact cosine-similarity index over unit vectors with one [`Document`] per
/// row.
///
/// Ordinals are assigned by insertion order and never reused. `dim` is fixed
/// by the first vector added. The row count of the backend always equals
/// `documents.len()`.
pub struct VectorIndex {
    pub(crate) kind: BackendKind,
    pub(crate) dim: Option<usize>,
    pub(crate) backend: Option<Box<dyn VectorBackend>>,
    pub(crate) documents: Vec<Document>,
}

impl VectorIndex {
    pub fn new(kind: BackendKind) -> Self {
        Self { kind, dim: None, backend: None, documents: Vec::new() }
    }

    /// Empty index using the backend the selection policy resolves to.
    pub fn from_mode(mode: NativeMode) -> Self {
        Self::new(resolve_backend(mode))
    }

    pub fn backend_kind(&self) -> BackendKind { self.kind }
    pub fn dim(&self) -> Option<usize> { self.dim }
    pub fn len(&self) -> usize { self.documents.len() }
    pub fn is_empty(&self) -> bool { self.documents.is_empty() }
    pub fn has_data(&self) -> bool { !self.is_empty() }
    pub fn documents(&self) -> &[Document] { &self.documents }

    /// Append documents with their embeddings, in order.
    ///
    /// Every vector is checked against the index dimension before anything is
    /// stored, so a failing call leaves the index unchanged.
    pub fn add(&mut self, documents: Vec<Document>, vectors: Vec<Vec<f32>>) -> Result<()> {
        if documents.len() != vectors.len() {
            return Err(Error::Operation(format!(
                "{} documents but {} embeddings",
                documents.len(),
                vectors.len()
            )));
        }
        let Some(first) = vectors.first() else { return Ok(()) };
        let dim = self.dim.unwrap_or(first.len());
        if dim == 0 {
            return Err(Error::Operation("cannot index zero-length embeddings".into()));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(Error::DimensionMismatch { expected: dim, got: bad.len() });
        }

        let rows: Vec<Vec<f32>> = vectors.into_iter().map(normalized).collect();
        match self.backend.as_mut() {
            Some(backend) => backend.add(&rows)?,
            None => {
                let mut backend = new_backend(self.kind, dim)?;
                backend.add(&rows)?;
                self.backend = Some(backend);
            }
        }
        self.dim = Some(dim);
        self.documents.extend(documents);
        debug!(added = rows.len(), total = self.documents.len(), dim, backend = %self.kind, "vectors appended");
        Ok(())
    }

    /// The `k` stored documents most similar to `query`, score descending,
    /// ties by ordinal.
    pub fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<Citation>> {
        let (Some(backend), Some(dim)) = (&self.backend, self.dim) else { return Ok(Vec::new()) };
        if k == 0 || self.documents.is_empty() { return Ok(Vec::new()); }
        if query.len() != dim {
            return Err(Error::DimensionMismatch { expected: dim, got: query.len() });
        }
        let query = normalized(query.to_vec());
        let scores = backend.scores(&query)?;
        Ok(rank(&scores, k)
            .into_iter()
            .filter_map(|(ordinal, score)| self.documents.get(ordinal).map(|d| Citation::new(d.clone(), score)))
            .collect())
    }
}

/// Ordinals of the top `k` scores: descending, ties by lower ordinal.
pub fn rank(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut order: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    order.truncate(k);
    order
}

#[cfg(test)]
mod tests {
    use super::rank;

    #[test]
    fn rank_breaks_ties_by_ordinal() {
        assert_eq!(rank(&[0.5, 0.9, 0.5, -0.1], 3), vec![(1, 0.9), (0, 0.5), (2, 0.5)]);
        assert!(rank(&[0.3], 0).is_empty());
    }
}
