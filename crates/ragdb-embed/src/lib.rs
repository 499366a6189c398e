use futures::future::{self, BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use ragdb_core::config::EmbeddingSettings;
use ragdb_core::error::ProviderError;
use ragdb_core::traits::Embedder;

pub mod normalize;
pub mod service;
pub mod tokenize;

pub use normalize::{dot, l2_normalize, normalized};
pub use service::ServiceEmbedder;

/// Dimension shared by every embedding strategy, so an index built with the
/// service can be queried offline and vice versa.
pub const EMBED_DIMENSION: usize = 1536;

/// Deterministic offline embedder: feature-hashed bag of lowercased
/// whitespace tokens, L2-normalized.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
    id: String,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("hash:xxh64:d{dim}") }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        if self.dim == 0 { return v; }
        for token in tokenize::whitespace_tokens(text) {
            v[tokenize::bucket(&token, self.dim)] += 1.0;
        }
        normalized(v)
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self { Self::new(EMBED_DIMENSION) }
}

impl Embedder for HashingEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, std::result::Result<Vec<Vec<f32>>, ProviderError>> {
        future::ready(Ok(texts.iter().map(|t| self.embed_text(t)).collect())).boxed()
    }
}

/// Embeds with `primary` and re-embeds the whole batch with hashing when the
/// primary reports a provider error or misses its deadline.
pub struct FallbackEmbedder {
    primary: Box<dyn Embedder>,
    fallback: HashingEmbedder,
    deadline: Option<Duration>,
}

impl FallbackEmbedder {
    pub fn new(primary: Box<dyn Embedder>) -> Self {
        let fallback = HashingEmbedder::new(primary.dim());
        Self { primary, fallback, deadline: None }
    }

    /// Bound each primary call; an elapsed call counts as a provider timeout.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    async fn embed_primary(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        let Some(deadline) = self.deadline else {
            return self.primary.embed_batch(texts).await;
        };
        match tokio::time::timeout(deadline, self.primary.embed_batch(texts)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(deadline.as_secs())),
        }
    }
}

impl Embedder for FallbackEmbedder {
    fn embedder_id(&self) -> &str { self.primary.embedder_id() }
    fn dim(&self) -> usize { self.primary.dim() }
    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, std::result::Result<Vec<Vec<f32>>, ProviderError>> {
        async move {
            match self.embed_primary(texts).await {
                Ok(vectors) => Ok(vectors),
                Err(e) => {
                    warn!(embedder = self.primary.embedder_id(), error = %e, batch = texts.len(), "embedding service failed, using hashing fallback");
                    self.fallback.embed_batch(texts).await
                }
            }
        }
        .boxed()
    }
}

/// Pick the embedding strategy for these settings.
///
/// `APP_USE_FAKE_EMBEDDINGS=1` forces hashing; otherwise a configured API key
/// selects the service (with hashing fallback), and no key selects hashing.
pub fn default_embedder(settings: &EmbeddingSettings) -> Arc<dyn Embedder> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let api_key = settings.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty());

    match (use_fake, api_key) {
        (false, Some(key)) => {
            match ServiceEmbedder::new(settings, key, EMBED_DIMENSION) {
                Ok(service) => {
                    info!(model = %settings.model, endpoint = %settings.endpoint, "using embedding service");
                    Arc::new(FallbackEmbedder::new(Box::new(service)).with_deadline(Duration::from_secs(settings.timeout_secs)))
                }
                Err(e) => {
                    warn!(error = %e, "embedding service unavailable, using hashing embedder");
                    Arc::new(HashingEmbedder::default())
                }
            }
        }
        _ => {
            info!(dim = EMBED_DIMENSION, "using hashing embedder");
            Arc::new(HashingEmbedder::default())
        }
    }
}
