//! ragdb-hybrid
//!
//! Retrieval over the vector index with a lexical fallback, answer
//! generation, and the [`Assistant`] session tying them to grounding checks.
pub mod answer;
pub mod assistant;
pub mod retrieval;

pub use answer::{default_generator, ChatGenerator, TemplateGenerator};
pub use assistant::{AskResponse, Assistant, IndexStatus, IngestSummary, NO_DATA_ANSWER, NO_MATCHES_ANSWER};
pub use retrieval::{Retrieval, RetrievalService};
