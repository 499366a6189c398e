//! Batched embedding of documents, optionally with a progress bar.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use ragdb_core::error::{ProviderError, Result};
use ragdb_core::traits::Embedder;
use ragdb_core::types::Document;

use crate::backend::BackendKind;
use crate::index::VectorIndex;

#[derive(Clone)]
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    embed_timeout: Duration,
    show_progress: bool,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder, batch_size: 64, embed_timeout: Duration::from_secs(30), show_progress: false }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }

    /// Fresh index of `kind` holding `documents`.
    pub async fn build(&self, documents: Vec<Document>, kind: BackendKind) -> Result<VectorIndex> {
        let vectors = self.embed_documents(&documents).await?;
        let mut index = VectorIndex::new(kind);
        index.add(documents, vectors)?;
        info!(count = index.len(), backend = %kind, embedder = self.embedder.embedder_id(), "index built");
        Ok(index)
    }

    /// Embeddings of each document's `embedding_text`, in order.
    pub async fn embed_documents(&self, documents: &[Document]) -> Result<Vec<Vec<f32>>> {
        let pb = if self.show_progress { ProgressBar::new(documents.len() as u64) } else { ProgressBar::hidden() };
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        let mut vectors = Vec::with_capacity(documents.len());
        for batch in documents.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(Document::embedding_text).collect();
            vectors.extend(self.embed_texts(&texts).await?);
            pb.inc(batch.len() as u64);
        }
        pb.finish_with_message("embedded");
        Ok(vectors)
    }

    /// One embedding call bounded by the configured timeout.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = match tokio::time::timeout(self.embed_timeout, self.embedder.embed_batch(texts)).await {
            Ok(result) => result?,
            Err(_) => return Err(ProviderError::Timeout(self.embed_timeout.as_secs()).into()),
        };
        if vectors.len() != texts.len() {
            return Err(ProviderError::MalformedResponse(format!(
                "asked for {} embeddings, got {}",
                texts.len(),
                vectors.len()
            ))
            .into());
        }
        Ok(vectors)
    }
}
