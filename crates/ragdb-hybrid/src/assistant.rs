//! The session object: owns the swappable index handle, the generator and
//! the verifier, and answers questions end to end.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

use ragdb_core::config::Settings;
use ragdb_core::error::Result;
use ragdb_core::traits::{AnswerGenerator, Embedder};
use ragdb_core::types::{Citation, Document, GenerationOverrides, SourceKind};
use ragdb_ground::{GroundingReport, GroundingVerifier};
use ragdb_vector::{read_metadata, resolve_backend, BackendKind, IndexBuilder, PersistenceError, SharedIndex, VectorIndex};

use crate::retrieval::{Retrieval, RetrievalService};

pub const NO_DATA_ANSWER: &str = "No data ingested yet";
pub const NO_MATCHES_ANSWER: &str = "No influencers found";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub count: usize,
    pub names: Vec<String>,
    /// Documents per niche; a document listing several niches counts once
    /// for each.
    pub niches: BTreeMap<String, usize>,
    /// Distinct handles, compared case-insensitively.
    pub unique_handles: usize,
    /// Most used `#tags` across sample posts, most frequent first.
    pub top_hashtags: Vec<(String, usize)>,
    pub backend: BackendKind,
    pub ingested_at: DateTime<Utc>,
}

impl IngestSummary {
    fn new(documents: &[Document], backend: BackendKind) -> Self {
        let mut niches = BTreeMap::new();
        for doc in documents {
            for niche in doc.niche.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                *niches.entry(niche.to_string()).or_insert(0) += 1;
            }
        }
        Self {
            count: documents.len(),
            names: documents.iter().map(|d| d.name.clone()).collect(),
            niches,
            unique_handles: documents.iter().map(|d| d.handle.to_lowercase()).collect::<HashSet<_>>().len(),
            top_hashtags: top_hashtags(documents, TOP_HASHTAGS),
            backend,
            ingested_at: Utc::now(),
        }
    }
}

const TOP_HASHTAGS: usize = 10;

/// Tags are lowercased and cut to word characters; ties keep first-seen order.
fn top_hashtags(documents: &[Document], limit: usize) -> Vec<(String, usize)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let tags = documents.iter().flat_map(|d| d.sample_post.split_whitespace()).filter_map(|token| {
        let body: String = token.strip_prefix('#')?.chars().filter(|c| c.is_alphanumeric() || *c == '_').flat_map(char::to_lowercase).collect();
        (!body.is_empty()).then(|| format!("#{body}"))
    });
    for tag in tags {
        let count = counts.entry(tag.clone()).or_insert(0);
        if *count == 0 { order.push(tag); }
        *count += 1;
    }
    let mut ranked: Vec<(String, usize)> = order.into_iter().map(|tag| { let n = counts[&tag]; (tag, n) }).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(limit);
    ranked
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub grounding: GroundingReport,
    /// Which stage produced the citations; absent when there were none.
    pub source: Option<SourceKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStatus {
    pub count: usize,
    pub backend: BackendKind,
    pub persist_dir: PathBuf,
}

pub struct Assistant {
    persist_dir: PathBuf,
    backend: BackendKind,
    builder: IndexBuilder,
    index: ArcSwap<SharedIndex>,
    writer: Mutex<()>,
    generator: Arc<dyn AnswerGenerator>,
    retrieval: RetrievalService,
    verifier: GroundingVerifier,
    last_ingest: ArcSwap<Option<IngestSummary>>,
}

impl Assistant {
    /// Open the persisted index under `settings.data.persist_dir`.
    ///
    /// An unusable index whose metadata survives is re-embedded; anything
    /// else starts empty.
    pub async fn open(settings: &Settings, embedder: Arc<dyn Embedder>, generator: Arc<dyn AnswerGenerator>) -> Self {
        let persist_dir = settings.data.persist_path();
        let backend = resolve_backend(settings.index.use_native);
        // Outer bound sits above the per-call service deadline so a late
        // service response still leaves room for the hashing fallback.
        let embed_timeout = Duration::from_secs(settings.embedding.timeout_secs.saturating_mul(2).saturating_add(5));
        let builder = IndexBuilder::new(embedder)
            .batch_size(settings.index.batch_size)
            .embed_timeout(embed_timeout);

        let index = open_index(&persist_dir, backend, &builder).await;
        Self {
            persist_dir,
            backend,
            index: ArcSwap::from_pointee(SharedIndex::new(index, builder.clone())),
            builder,
            writer: Mutex::new(()),
            generator,
            retrieval: RetrievalService::new(&settings.retrieval),
            verifier: GroundingVerifier::new(&settings.grounding),
            last_ingest: ArcSwap::from_pointee(None),
        }
    }

    /// Show a progress bar while embedding ingested documents.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.builder = self.builder.show_progress(show);
        self
    }

    pub fn persist_dir(&self) -> &Path { &self.persist_dir }

    /// The live index. Holders keep a consistent snapshot across a swap.
    pub fn index(&self) -> Arc<SharedIndex> { self.index.load_full() }

    pub fn last_ingest(&self) -> Option<IngestSummary> { Option::clone(&self.last_ingest.load()) }

    pub async fn status(&self) -> IndexStatus {
        let index = self.index();
        IndexStatus { count: index.len().await, backend: index.backend_kind().await, persist_dir: self.persist_dir.clone() }
    }

    /// Replace the index with one built from `documents`.
    ///
    /// The new index is fully built and persisted before it becomes visible;
    /// searches in flight keep using the old one.
    pub async fn ingest(&self, documents: Vec<Document>) -> Result<IngestSummary> {
        let _writer = self.writer.lock().await;
        let index = self.builder.build(documents, self.backend).await?;
        let backend = match index.save(&self.persist_dir) {
            Ok(recorded) => recorded,
            Err(e) => {
                warn!(dir = %self.persist_dir.display(), error = %e, "ingested index not persisted");
                index.backend_kind()
            }
        };
        let summary = IngestSummary::new(index.documents(), backend);
        self.index.store(Arc::new(SharedIndex::new(index, self.builder.clone())));
        self.last_ingest.store(Arc::new(Some(summary.clone())));
        info!(count = summary.count, backend = %summary.backend, "ingest complete");
        Ok(summary)
    }

    /// Append to the live index and persist it; returns the new count.
    pub async fn append(&self, documents: Vec<Document>) -> Result<usize> {
        let _writer = self.writer.lock().await;
        let index = self.index();
        let count = index.add_documents(documents).await?;
        if let Err(e) = index.save(&self.persist_dir).await {
            warn!(dir = %self.persist_dir.display(), error = %e, "appended index not persisted");
        }
        Ok(count)
    }

    /// Raw vector citations, unfiltered.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<Citation>> {
        self.index().search(query, k).await
    }

    pub async fn retrieve(&self, query: &str) -> Retrieval {
        self.retrieval.retrieve(&self.index(), query, self.retrieval.top_k()).await
    }

    pub async fn ask(&self, query: &str, overrides: &GenerationOverrides) -> AskResponse {
        let retrieval = self.retrieve(query).await;
        let source = retrieval.source();
        let (answer, citations) = match retrieval {
            Retrieval::NoData => (NO_DATA_ANSWER.to_string(), Vec::new()),
            Retrieval::NoMatches => (NO_MATCHES_ANSWER.to_string(), Vec::new()),
            Retrieval::Found { citations, .. } => {
                let generated = self.generator.generate(query, &citations, overrides).await;
                (generated.answer, generated.citations)
            }
        };
        let grounding = self.verifier.evaluate(query, &answer, &citations);
        AskResponse { answer, citations, grounding, source }
    }

    pub fn verify(&self, query: &str, answer: &str, citations: &[Citation]) -> GroundingReport {
        self.verifier.evaluate(query, answer, citations)
    }
}

async fn open_index(dir: &Path, backend: BackendKind, builder: &IndexBuilder) -> VectorIndex {
    let dim = builder.embedder().dim();
    let reason = match VectorIndex::try_load(dir) {
        Ok(index) if index.dim().map_or(true, |d| d == dim) => {
            info!(dir = %dir.display(), count = index.len(), backend = %index.backend_kind(), "index loaded");
            return index;
        }
        Ok(index) => format!("index dimension {:?} does not match embedder dimension {dim}", index.dim()),
        Err(PersistenceError::Missing(_)) => {
            info!(dir = %dir.display(), "no persisted index, starting empty");
            return VectorIndex::new(backend);
        }
        Err(e) => e.to_string(),
    };

    let documents = match read_metadata(dir) {
        Ok(documents) if !documents.is_empty() => documents,
        _ => {
            warn!(dir = %dir.display(), reason = %reason, "persisted index unusable, starting empty");
            return VectorIndex::new(backend);
        }
    };
    warn!(dir = %dir.display(), reason = %reason, count = documents.len(), "rebuilding index from metadata");
    match builder.build(documents, backend).await {
        Ok(index) => {
            if let Err(e) = index.save(dir) {
                warn!(dir = %dir.display(), error = %e, "rebuilt index not persisted");
            }
            index
        }
        Err(e) => {
            warn!(error = %e, "rebuild failed, starting empty");
            VectorIndex::new(backend)
        }
    }
}
