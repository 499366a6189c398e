use std::path::Path;
use tokio::sync::RwLock;
use tracing::debug;

use ragdb_core::error::Result;
use ragdb_core::types::{Citation, Document};

use crate::backend::BackendKind;
use crate::builder::IndexBuilder;
use crate::index::VectorIndex;
use crate::persist::PersistenceError;

/// A [`VectorIndex`] behind a reader/writer lock, plus the embedder that
/// feeds it.
///
/// Embedding always happens before a lock is taken; writers (append, save)
/// hold the lock only for the in-memory or on-disk operation.
pub struct SharedIndex {
    index: RwLock<VectorIndex>,
    builder: IndexBuilder,
}

impl SharedIndex {
    pub fn new(index: VectorIndex, builder: IndexBuilder) -> Self {
        Self { index: RwLock::new(index), builder }
    }

    pub fn builder(&self) -> &IndexBuilder { &self.builder }

    /// Embed and append `documents`; returns the new document count.
    pub async fn add_documents(&self, documents: Vec<Document>) -> Result<usize> {
        if documents.is_empty() { return Ok(self.len().await); }
        let vectors = self.builder.embed_documents(&documents).await?;
        let mut index = self.index.write().await;
        index.add(documents, vectors)?;
        Ok(index.len())
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<Citation>> {
        if k == 0 || !self.has_data().await { return Ok(Vec::new()); }
        let mut vectors = self.builder.embed_texts(&[query.to_string()]).await?;
        let query_vector = vectors.pop().unwrap_or_default();
        let citations = self.index.read().await.search_vector(&query_vector, k)?;
        debug!(k, hits = citations.len(), "vector search");
        Ok(citations)
    }

    pub async fn has_data(&self) -> bool { self.index.read().await.has_data() }
    pub async fn len(&self) -> usize { self.index.read().await.len() }
    pub async fn is_empty(&self) -> bool { self.index.read().await.is_empty() }
    pub async fn backend_kind(&self) -> BackendKind { self.index.read().await.backend_kind() }

    /// Snapshot of the stored documents in ordinal order.
    pub async fn documents(&self) -> Vec<Document> { self.index.read().await.documents().to_vec() }

    /// Persist under the write lock so no append interleaves with the save.
    pub async fn save(&self, dir: &Path) -> std::result::Result<BackendKind, PersistenceError> {
        let index = self.index.write().await;
        index.save(dir)
    }

    pub fn into_inner(self) -> VectorIndex { self.index.into_inner() }
}
