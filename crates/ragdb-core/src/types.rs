//! Domain types shared by the index, retrieval and grounding crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Meta = BTreeMap<String, serde_json::Value>;

/// One ingested profile: the unit that is embedded, stored and cited.
///
/// - `name`/`handle`/`niche`/`sample_post`: the text-bearing fields used by
///   keyword matching and grounding
/// - `followers`: audience size when known
/// - `chunks`: the post split for display and export
/// - `extra`: any other attribute carried by the source record
///
/// Documents are immutable once stored; the index owns its copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub niche: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
    #[serde(default)]
    pub sample_post: String,
    /// Word-boundary pieces of a long `sample_post`; empty when the post fits
    /// in one chunk or was never chunked.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<String>,
    #[serde(flatten)]
    pub extra: Meta,
}

impl Document {
    pub fn new(name: impl Into<String>, handle: impl Into<String>, niche: impl Into<String>, sample_post: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: handle.into(),
            niche: niche.into(),
            sample_post: sample_post.into(),
            ..Self::default()
        }
    }

    /// Text fed to the embedder: `"{niche}. {sample_post}"`.
    pub fn embedding_text(&self) -> String {
        format!("{}. {}", self.niche, self.sample_post)
    }

    /// Text-bearing fields in keyword-scan order.
    pub fn text_fields(&self) -> [&str; 4] {
        [&self.niche, &self.sample_post, &self.name, &self.handle]
    }

    /// All text-bearing fields joined by a single space.
    pub fn searchable_text(&self) -> String {
        self.text_fields().join(" ")
    }
}

/// Indicates which stage produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Vector,
    Keyword,
}

/// A retrieved document plus its cosine similarity to the query.
///
/// Keyword-fallback hits carry a score of `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(flatten)]
    pub document: Document,
    #[serde(default)]
    pub score: f32,
}

impl Citation {
    pub fn new(document: Document, score: f32) -> Self {
        Self { document, score }
    }
}

/// Per-request overrides for the answer generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOverrides {
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
}

/// Output of an [`AnswerGenerator`](crate::traits::AnswerGenerator).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub citations: Vec<Citation>,
}
