use tracing::{debug, warn};

use ragdb_core::config::RetrievalSettings;
use ragdb_core::types::{Citation, SourceKind};
use ragdb_text::{keyword_matches, rerank_by_overlap};
use ragdb_vector::SharedIndex;

/// Outcome of retrieving evidence for one query.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    Found { citations: Vec<Citation>, source: SourceKind },
    /// Documents exist but neither vector nor keyword search matched.
    NoMatches,
    /// Nothing has been ingested.
    NoData,
}

impl Retrieval {
    pub fn citations(&self) -> &[Citation] {
        match self {
            Self::Found { citations, .. } => citations,
            Self::NoMatches | Self::NoData => &[],
        }
    }

    pub fn source(&self) -> Option<SourceKind> {
        match self {
            Self::Found { source, .. } => Some(*source),
            Self::NoMatches | Self::NoData => None,
        }
    }
}

/// Vector search, positive-score filter, optional overlap rerank and a
/// substring keyword fallback.
#[derive(Debug, Clone)]
pub struct RetrievalService {
    top_k: usize,
    rerank: bool,
    keyword_fallback: bool,
}

impl RetrievalService {
    pub fn new(settings: &RetrievalSettings) -> Self {
        Self { top_k: settings.top_k, rerank: settings.rerank, keyword_fallback: settings.keyword_fallback }
    }

    pub fn top_k(&self) -> usize { self.top_k }

    pub async fn retrieve(&self, index: &SharedIndex, query: &str, top_k: usize) -> Retrieval {
        if !index.has_data().await {
            return Retrieval::NoData;
        }

        let hits = match index.search(query, top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "vector search failed, treating as no hits");
                Vec::new()
            }
        };
        let mut citations: Vec<Citation> = hits.into_iter().filter(|c| c.score > 0.0).collect();
        if self.rerank {
            citations = rerank_by_overlap(query, citations);
        }
        if !citations.is_empty() {
            debug!(hits = citations.len(), "vector retrieval");
            return Retrieval::Found { citations, source: SourceKind::Vector };
        }

        if self.keyword_fallback {
            let documents = index.documents().await;
            let matches: Vec<Citation> =
                keyword_matches(query, &documents).into_iter().map(|d| Citation::new(d.clone(), 0.0)).collect();
            if !matches.is_empty() {
                debug!(hits = matches.len(), "keyword fallback retrieval");
                return Retrieval::Found { citations: matches, source: SourceKind::Keyword };
            }
        }
        Retrieval::NoMatches
    }
}
