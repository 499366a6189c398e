//! ragdb-text
//!
//! Lexical helpers shared by retrieval and grounding: word tokenization,
//! the keyword fallback scan, and token-overlap reranking.
pub mod rerank;
pub mod search;
pub mod tokenizer;

pub use rerank::{overlap_count, rerank_by_overlap};
pub use search::{keyword_matches, matches_keyword};
pub use tokenizer::{is_stopword, key_words, query_tokens, words, STOPWORDS};
