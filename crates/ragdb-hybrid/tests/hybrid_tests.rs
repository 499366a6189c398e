use futures::future::{self, BoxFuture, FutureExt};
use std::sync::Arc;
use tempfile::TempDir;

use ragdb_core::config::{NativeMode, Settings};
use ragdb_core::error::ProviderError;
use ragdb_core::traits::Embedder;
use ragdb_core::types::{Document, GenerationOverrides, SourceKind};
use ragdb_embed::HashingEmbedder;
use ragdb_hybrid::{Assistant, Retrieval, TemplateGenerator, NO_DATA_ANSWER, NO_MATCHES_ANSWER};
use ragdb_vector::{read_manifest, BackendKind};

fn scenario_docs() -> Vec<Document> {
    vec![
        Document::new("Aarav Mehta", "@aarav", "AI startups", "Scaling seed-stage AI companies"),
        Document::new("Sanya Kapoor", "@sanya", "fitness", "Morning workout routines"),
        Document::new("Kabir Malhotra", "@kabir", "crypto", "Bitcoin market analysis"),
    ]
}

fn settings(dir: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.data.persist_dir = dir.path().to_string_lossy().into_owned();
    settings.index.use_native = NativeMode::Off;
    settings
}

async fn open_with(settings: &Settings, embedder: Arc<dyn Embedder>) -> Assistant {
    Assistant::open(settings, embedder, Arc::new(TemplateGenerator)).await
}

async fn open(settings: &Settings) -> Assistant {
    open_with(settings, Arc::new(HashingEmbedder::default())).await
}

#[tokio::test]
async fn ask_before_ingest_reports_no_data() {
    let tmp = TempDir::new().unwrap();
    let assistant = open(&settings(&tmp)).await;

    let response = assistant.ask("AI startups", &GenerationOverrides::default()).await;

    assert_eq!(response.answer, NO_DATA_ANSWER);
    assert!(response.citations.is_empty());
    assert_eq!(response.source, None);
    assert!(response.grounding.is_hallucination);
    assert_eq!(response.grounding.score, 1.0);
}

#[tokio::test]
async fn ingest_then_ask_cites_the_matching_influencer() {
    let tmp = TempDir::new().unwrap();
    let assistant = open(&settings(&tmp)).await;

    let summary = assistant.ingest(scenario_docs()).await.expect("ingest");
    assert_eq!(summary.count, 3);
    assert_eq!(summary.names, vec!["Aarav Mehta", "Sanya Kapoor", "Kabir Malhotra"]);
    assert_eq!(summary.niches.get("crypto"), Some(&1));
    assert_eq!(summary.backend, BackendKind::Flat);
    assert_eq!(assistant.last_ingest(), Some(summary));

    for (query, name, handle) in [
        ("AI startups", "Aarav Mehta", "@aarav"),
        ("workout routine", "Sanya Kapoor", "@sanya"),
        ("crypto market", "Kabir Malhotra", "@kabir"),
    ] {
        let response = assistant.ask(query, &GenerationOverrides::default()).await;
        assert_eq!(response.source, Some(SourceKind::Vector));
        assert_eq!(response.citations.len(), 1, "{query}: only positive scores survive");
        assert_eq!(response.citations[0].document.name, name);
        assert!(response.citations[0].score > 0.0);
        assert!(response.answer.contains(name) && response.answer.contains(handle), "{}", response.answer);
        assert!(response.grounding.score >= 0.0 && response.grounding.score <= 1.0);
    }
}

#[tokio::test]
async fn unrelated_query_finds_nothing() {
    let tmp = TempDir::new().unwrap();
    let assistant = open(&settings(&tmp)).await;
    assistant.ingest(scenario_docs()).await.unwrap();

    let response = assistant.ask("best pizza topping", &GenerationOverrides::default()).await;

    assert_eq!(response.answer, NO_MATCHES_ANSWER);
    assert!(response.citations.is_empty());
    assert!(response.grounding.is_hallucination);
}

#[tokio::test]
async fn keyword_fallback_matches_names() {
    let tmp = TempDir::new().unwrap();
    let assistant = open(&settings(&tmp)).await;
    assistant.ingest(scenario_docs()).await.unwrap();

    match assistant.retrieve("kabir").await {
        Retrieval::Found { citations, source } => {
            assert_eq!(source, SourceKind::Keyword);
            assert_eq!(citations.len(), 1);
            assert_eq!(citations[0].document.handle, "@kabir");
            assert_eq!(citations[0].score, 0.0);
        }
        other => panic!("expected keyword hits, got {other:?}"),
    }

    let mut no_fallback = settings(&tmp);
    no_fallback.retrieval.keyword_fallback = false;
    let strict = open(&no_fallback).await;
    assert_eq!(strict.retrieve("kabir").await, Retrieval::NoMatches);
}

#[tokio::test]
async fn ingested_index_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let settings = settings(&tmp);
    let first = open(&settings).await;
    first.ingest(scenario_docs()).await.unwrap();
    let before = first.search("crypto market", 3).await.unwrap();

    let reopened = open(&settings).await;
    let status = reopened.status().await;
    assert_eq!(status.count, 3);
    assert_eq!(status.backend, BackendKind::Flat);
    assert_eq!(reopened.last_ingest(), None);

    let after = reopened.search("crypto market", 3).await.unwrap();
    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(&after) {
        assert_eq!(a.document, b.document);
        assert!((a.score - b.score).abs() < 1e-5);
    }
}

#[tokio::test]
async fn dimension_change_rebuilds_from_metadata() {
    let tmp = TempDir::new().unwrap();
    let settings = settings(&tmp);
    open_with(&settings, Arc::new(HashingEmbedder::new(8))).await.ingest(scenario_docs()).await.unwrap();
    assert_eq!(read_manifest(tmp.path()).unwrap().dim, Some(8));

    let reopened = open(&settings).await;

    assert_eq!(reopened.status().await.count, 3);
    assert_eq!(read_manifest(tmp.path()).unwrap().dim, Some(ragdb_embed::EMBED_DIMENSION));
    let hits = reopened.search("AI startups", 1).await.unwrap();
    assert_eq!(hits[0].document.name, "Aarav Mehta");
}

#[tokio::test]
async fn append_extends_and_persists() {
    let tmp = TempDir::new().unwrap();
    let settings = settings(&tmp);
    let assistant = open(&settings).await;
    assistant.ingest(scenario_docs()).await.unwrap();

    let extra = Document::new("Meera Iyer", "@meera", "cooking", "Weeknight pasta recipes");
    assert_eq!(assistant.append(vec![extra]).await.unwrap(), 4);

    let response = assistant.ask("pasta recipes", &GenerationOverrides::default()).await;
    assert_eq!(response.citations[0].document.name, "Meera Iyer");
    assert_eq!(open(&settings).await.status().await.count, 4);
}

#[tokio::test]
async fn empty_ingest_resets_the_index() {
    let tmp = TempDir::new().unwrap();
    let assistant = open(&settings(&tmp)).await;
    assistant.ingest(scenario_docs()).await.unwrap();

    let summary = assistant.ingest(Vec::new()).await.unwrap();

    assert_eq!(summary.count, 0);
    let response = assistant.ask("AI startups", &GenerationOverrides::default()).await;
    assert_eq!(response.answer, NO_DATA_ANSWER);
}

#[tokio::test]
async fn held_snapshot_is_unaffected_by_ingest() {
    let tmp = TempDir::new().unwrap();
    let assistant = open(&settings(&tmp)).await;
    assistant.ingest(scenario_docs()).await.unwrap();
    let snapshot = assistant.index();

    assistant.ingest(scenario_docs()[..1].to_vec()).await.unwrap();

    assert_eq!(snapshot.len().await, 3);
    assert_eq!(assistant.index().len().await, 1);
}

struct UnreachableService;

impl Embedder for UnreachableService {
    fn embedder_id(&self) -> &str { "unreachable" }
    fn dim(&self) -> usize { ragdb_embed::EMBED_DIMENSION }
    fn embed_batch<'a>(&'a self, _texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>, ProviderError>> {
        future::ready(Err(ProviderError::Network("connection refused".into()))).boxed()
    }
}

#[tokio::test]
async fn query_embedding_failure_degrades_to_keywords() {
    let tmp = TempDir::new().unwrap();
    let settings = settings(&tmp);
    open(&settings).await.ingest(scenario_docs()).await.unwrap();

    let assistant = open_with(&settings, Arc::new(UnreachableService)).await;

    let response = assistant.ask("fitness", &GenerationOverrides::default()).await;
    assert_eq!(response.source, Some(SourceKind::Keyword));
    assert_eq!(response.citations[0].document.name, "Sanya Kapoor");

    assert!(assistant.ingest(scenario_docs()).await.is_err());
    assert_eq!(assistant.status().await.count, 3, "failed ingest keeps the old index");
}

fn trading_docs() -> Vec<Document> {
    vec![
        Document::new("Priya Nair", "@priya", "crypto", "bitcoin bitcoin bitcoin daily"),
        Document::new("Rohan Das", "@rohan", "crypto", "bitcoin and ethereum trading tips"),
        Document::new("Sanya Kapoor", "@sanya", "fitness", "Morning workout routines"),
    ]
}

#[tokio::test]
async fn rerank_promotes_citations_sharing_more_query_terms() {
    let query = "bitcoin trading rohan";

    let tmp = TempDir::new().unwrap();
    let plain = open(&settings(&tmp)).await;
    plain.ingest(trading_docs()).await.unwrap();
    let response = plain.ask(query, &GenerationOverrides::default()).await;
    let names: Vec<&str> = response.citations.iter().map(|c| c.document.name.as_str()).collect();
    assert_eq!(names, vec!["Priya Nair", "Rohan Das"]);

    let tmp = TempDir::new().unwrap();
    let mut reranked_settings = settings(&tmp);
    reranked_settings.retrieval.rerank = true;
    let reranked = open(&reranked_settings).await;
    reranked.ingest(trading_docs()).await.unwrap();
    let response = reranked.ask(query, &GenerationOverrides::default()).await;
    assert_eq!(response.source, Some(SourceKind::Vector));
    let names: Vec<&str> = response.citations.iter().map(|c| c.document.name.as_str()).collect();
    assert_eq!(names, vec!["Rohan Das", "Priya Nair"]);
    assert!(response.citations[0].score < response.citations[1].score, "rerank keeps the vector scores");
}

#[tokio::test]
async fn ingest_summary_counts_handles_and_hashtags() {
    let tmp = TempDir::new().unwrap();
    let assistant = open(&settings(&tmp)).await;
    let docs = vec![
        Document::new("Priya Nair", "@priya", "crypto", "#Bitcoin daily #hodl"),
        Document::new("Priya N", "@PRIYA", "crypto", "more #bitcoin! and # and #!!"),
        Document::new("Sanya Kapoor", "@sanya", "fitness", "#fitness #hodl #bitcoin"),
    ];

    let summary = assistant.ingest(docs).await.unwrap();

    assert_eq!(summary.count, 3);
    assert_eq!(summary.unique_handles, 2);
    assert_eq!(
        summary.top_hashtags,
        vec![("#bitcoin".to_string(), 3), ("#hodl".to_string(), 2), ("#fitness".to_string(), 1)]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn searches_run_while_append_is_in_flight() {
    let tmp = TempDir::new().unwrap();
    let assistant = Arc::new(open(&settings(&tmp)).await);
    assistant.ingest(scenario_docs()).await.unwrap();

    let extra: Vec<Document> = (0..20)
        .map(|i| Document::new(format!("Creator {i}"), format!("@creator{i}"), "travel", format!("Backpacking guide {i}")))
        .collect();
    let writer = {
        let assistant = Arc::clone(&assistant);
        tokio::spawn(async move { assistant.append(extra).await })
    };
    let readers: Vec<_> = (0..8)
        .map(|_| {
            let assistant = Arc::clone(&assistant);
            tokio::spawn(async move { assistant.search("crypto market", 3).await })
        })
        .collect();

    for reader in readers {
        let hits = reader.await.unwrap().expect("search during append");
        assert!(!hits.is_empty());
        assert_eq!(hits[0].document.name, "Kabir Malhotra");
    }
    assert_eq!(writer.await.unwrap().unwrap(), 23);
    assert_eq!(assistant.status().await.count, 23);
}
