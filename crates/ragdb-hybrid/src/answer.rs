//! Answer generation: an OpenAI-compatible chat service with a deterministic
//! offline template as fallback.

use futures::future::{self, BoxFuture, FutureExt};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use ragdb_core::config::GenerationSettings;
use ragdb_core::error::ProviderError;
use ragdb_core::traits::AnswerGenerator;
use ragdb_core::types::{Answer, Citation, GenerationOverrides};

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant for exploring Twitter/X influencers.\n\
Your job is to answer questions concisely using ONLY the provided influencer context.\n\
Always mention influencer names and handles when relevant.\n\
If the answer is not in the context, say you don't know.";

/// The offline answer: lists every cited name and handle.
pub fn template_answer(query: &str, citations: &[Citation]) -> String {
    let mentions: Vec<String> =
        citations.iter().map(|c| format!("{} ({})", c.document.name, c.document.handle)).collect();
    format!(
        "Based on the provided context for your question '{query}', relevant influencers include: {}.",
        mentions.join(", ")
    )
}

/// One line per citation: `- {name} ({handle}) | Niche: {niche} | Post: {post}`.
pub fn format_context(citations: &[Citation]) -> String {
    citations
        .iter()
        .map(|c| {
            let d = &c.document;
            format!("- {} ({}) | Niche: {} | Post: {}", d.name, d.handle, d.niche, d.sample_post)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGenerator;

impl AnswerGenerator for TemplateGenerator {
    fn generate<'a>(
        &'a self,
        query: &'a str,
        citations: &'a [Citation],
        _overrides: &'a GenerationOverrides,
    ) -> BoxFuture<'a, Answer> {
        future::ready(Answer { answer: template_answer(query, citations), citations: citations.to_vec() }).boxed()
    }
}

pub fn build_chat_request(model: &str, query: &str, citations: &[Citation], temperature: f32, max_tokens: u32) -> serde_json::Value {
    let user = format!(
        "Question: {query}\n\nInfluencer Context:\n{}\n\nRespond concisely and ground your answer in the above context.",
        format_context(citations)
    );
    serde_json::json!({
        "model": model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": user },
        ],
        "temperature": temperature,
        "max_tokens": max_tokens,
    })
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Trimmed content of the first choice; a missing content is an empty answer.
pub fn parse_chat_response(body: &str) -> Result<String, ProviderError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid chat completion JSON: {e}")))?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("chat completion has no choices".into()))?;
    Ok(choice.message.content.unwrap_or_default().trim().to_string())
}

/// Chat-completions client. Any failure, or a missing credential, yields the
/// template answer instead.
pub struct ChatGenerator {
    client: Client,
    settings: GenerationSettings,
}

impl ChatGenerator {
    pub fn new(settings: GenerationSettings) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    /// Per-request credential first, then the configured one.
    fn api_key<'a>(&'a self, overrides: &'a GenerationOverrides) -> Option<&'a str> {
        overrides
            .api_key
            .as_deref()
            .or(self.settings.api_key.as_deref())
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    async fn complete(
        &self,
        api_key: &str,
        query: &str,
        citations: &[Citation],
        overrides: &GenerationOverrides,
    ) -> Result<String, ProviderError> {
        let model = overrides.model.as_deref().unwrap_or(&self.settings.model);
        let endpoint = overrides.endpoint.as_deref().unwrap_or(&self.settings.endpoint);
        let url = format!("{}/chat/completions", endpoint.trim_end_matches('/'));
        debug!(url = %url, model, citations = citations.len(), "requesting chat completion");

        let body = build_chat_request(model, query, citations, self.settings.temperature, self.settings.max_tokens);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(&e))?;
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), &text));
        }
        parse_chat_response(&text)
    }

    fn transport_error(&self, e: &reqwest::Error) -> ProviderError {
        if e.is_timeout() { ProviderError::Timeout(self.settings.timeout_secs) } else { ProviderError::Network(e.to_string()) }
    }
}

impl AnswerGenerator for ChatGenerator {
    fn generate<'a>(
        &'a self,
        query: &'a str,
        citations: &'a [Citation],
        overrides: &'a GenerationOverrides,
    ) -> BoxFuture<'a, Answer> {
        async move {
            let answer = match self.api_key(overrides) {
                None => {
                    debug!("no generation credential, using template answer");
                    template_answer(query, citations)
                }
                Some(api_key) => match self.complete(api_key, query, citations, overrides).await {
                    Ok(answer) => answer,
                    Err(e) => {
                        warn!(error = %e, "chat completion failed, using template answer");
                        template_answer(query, citations)
                    }
                },
            };
            Answer { answer, citations: citations.to_vec() }
        }
        .boxed()
    }
}

/// Chat generator for these settings, or the template when no HTTP client can
/// be built.
pub fn default_generator(settings: &GenerationSettings) -> Arc<dyn AnswerGenerator> {
    match ChatGenerator::new(settings.clone()) {
        Ok(chat) => Arc::new(chat),
        Err(e) => {
            warn!(error = %e, "chat generator unavailable, answers use the template");
            Arc::new(TemplateGenerator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdb_core::types::Document;

    fn citations() -> Vec<Citation> {
        vec![Citation::new(Document::new("Kabir Malhotra", "@kabir", "crypto", "Bitcoin market analysis"), 0.4)]
    }

    #[test]
    fn chat_request_carries_prompt_and_context() {
        let body = build_chat_request("gpt-4o-mini", "Who covers crypto?", &citations(), 0.2, 300);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 300);
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.starts_with("Question: Who covers crypto?\n\nInfluencer Context:\n"));
        assert!(user.contains("- Kabir Malhotra (@kabir) | Niche: crypto | Post: Bitcoin market analysis"));
    }

    #[test]
    fn chat_response_is_trimmed() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "  Kabir covers crypto.\n"}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap(), "Kabir covers crypto.");
        assert_eq!(parse_chat_response(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap(), "");
        assert!(matches!(parse_chat_response(r#"{"choices": []}"#), Err(ProviderError::MalformedResponse(_))));
    }
}
