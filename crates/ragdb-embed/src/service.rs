//! Embeddings from an OpenAI-compatible `/embeddings` endpoint.

use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use ragdb_core::config::EmbeddingSettings;
use ragdb_core::error::ProviderError;
use ragdb_core::traits::Embedder;

use crate::normalize::normalized;

pub struct ServiceEmbedder {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    dim: usize,
    timeout_secs: u64,
    id: String,
}

impl ServiceEmbedder {
    pub fn new(settings: &EmbeddingSettings, api_key: &str, dim: usize) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: settings.model.clone(),
            endpoint: settings.endpoint.clone(),
            dim,
            timeout_secs: settings.timeout_secs,
            id: format!("service:{}:d{}", settings.model, dim),
        })
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let url = format!("{}/embeddings", self.endpoint.trim_end_matches('/'));
        debug!(url = %url, batch = texts.len(), model = %self.model, "requesting embeddings");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&build_request_body(&self.model, texts))
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(&e))?;
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }
        parse_embedding_response(&body, texts.len(), self.dim)
    }

    fn transport_error(&self, e: &reqwest::Error) -> ProviderError {
        if e.is_timeout() { ProviderError::Timeout(self.timeout_secs) } else { ProviderError::Network(e.to_string()) }
    }
}

impl Embedder for ServiceEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>, ProviderError>> {
        self.request(texts).boxed()
    }
}

pub fn build_request_body(model: &str, texts: &[String]) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "input": texts,
    })
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Parse an `/embeddings` response body into normalized vectors ordered by
/// their `index`. Every vector must have length `dim`.
pub fn parse_embedding_response(body: &str, expected: usize, dim: usize) -> Result<Vec<Vec<f32>>, ProviderError> {
    let mut parsed: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid embeddings JSON: {e}")))?;
    if parsed.data.len() != expected {
        return Err(ProviderError::MalformedResponse(format!(
            "expected {expected} embeddings, got {}",
            parsed.data.len()
        )));
    }
    parsed.data.sort_by_key(|item| item.index);
    parsed
        .data
        .into_iter()
        .map(|item| {
            if item.embedding.len() == dim {
                Ok(normalized(item.embedding))
            } else {
                Err(ProviderError::MalformedResponse(format!(
                    "embedding has {} dimensions, expected {dim}",
                    item.embedding.len()
                )))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_model_and_inputs() {
        let body = build_request_body("text-embedding-3-small", &["a".to_string(), "b".to_string()]);
        assert_eq!(body["model"], "text-embedding-3-small");
        assert_eq!(body["input"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn response_is_reordered_and_normalized() {
        let body = r#"{"data": [
            {"index": 1, "embedding": [0.0, 2.0]},
            {"index": 0, "embedding": [3.0, 4.0]}
        ]}"#;
        let vectors = parse_embedding_response(body, 2, 2).unwrap();
        assert_eq!(vectors[0], vec![0.6, 0.8]);
        assert_eq!(vectors[1], vec![0.0, 1.0]);
    }

    #[test]
    fn wrong_dimension_or_count_is_malformed() {
        let body = r#"{"data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]}"#;
        assert!(matches!(parse_embedding_response(body, 1, 2), Err(ProviderError::MalformedResponse(_))));
        assert!(matches!(parse_embedding_response(body, 2, 3), Err(ProviderError::MalformedResponse(_))));
        assert!(matches!(parse_embedding_response("nope", 1, 3), Err(ProviderError::MalformedResponse(_))));
    }
}
