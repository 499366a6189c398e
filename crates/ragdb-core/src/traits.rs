use futures::future::BoxFuture;

use crate::error::ProviderError;
use crate::types::{Answer, Citation, GenerationOverrides};

pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hash:xxh64:d1536`).
    fn embedder_id(&self) -> &str;
    /// Embedding dimensionality (D).
    fn dim(&self) -> usize;
    /// Compute L2-normalized embeddings for a batch of input texts, in order.
    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>, ProviderError>>;
}

pub trait AnswerGenerator: Send + Sync {
    /// Produce an answer grounded in `citations`. Never fails: implementations
    /// degrade to a deterministic offline answer.
    fn generate<'a>(
        &'a self,
        query: &'a str,
        citations: &'a [Citation],
        overrides: &'a GenerationOverrides,
    ) -> BoxFuture<'a, Answer>;
}
