use std::fs;
use tempfile::TempDir;

use ragdb_core::config::{expand_path, Config, DataSettings, NativeMode};
use ragdb_core::data_processor::{chunk_text, read_processed, write_processed, DataProcessor};
use ragdb_core::error::ProviderError;
use ragdb_core::types::{Citation, Document};

#[test]
fn process_single_file_normalizes_and_dedups() {
    let tmp = TempDir::new().unwrap();
    let file_path = tmp.path().join("sample.json");
    fs::write(
        &file_path,
        r#"[
            {"id": 1, "name": "  Aarav   Mehta ", "handle": "AaravAI", "followers": "12,300",
             "niche": ["AI", "Startups"], "sample_post": "Scaling   seed-stage AI companies", "country": "IN"},
            {"name": "Duplicate", "handle": "@aaravai", "niche": "ai"},
            {"name": "", "handle": "@nobody"},
            {"name": "Sanya Kapoor", "handle": "@sanya", "niche": "Fitness", "post": "Morning workout routines"}
        ]"#,
    )
    .unwrap();

    let outcome = DataProcessor::new().process_path(&file_path).expect("process");

    assert_eq!(outcome.raw_count, 4);
    assert_eq!(outcome.documents.len(), 2, "duplicate handle and nameless record dropped");
    let aarav = &outcome.documents[0];
    assert_eq!(aarav.name, "Aarav Mehta");
    assert_eq!(aarav.handle, "@aaravai");
    assert_eq!(aarav.niche, "ai, startups");
    assert_eq!(aarav.followers, Some(12_300));
    assert_eq!(aarav.sample_post, "Scaling seed-stage AI companies");
    assert_eq!(aarav.id.as_deref(), Some("1"));
    assert_eq!(aarav.extra.get("country"), Some(&serde_json::json!("IN")));
    assert_eq!(outcome.documents[1].sample_post, "Morning workout routines", "falls back to `post`");
}

#[test]
fn process_directory_reads_wrapped_lists_and_skips_bad_files() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("a.json"), r#"{"records": [{"name": "Kabir Malhotra", "handle": "@kabir", "niche": "crypto"}]}"#).unwrap();
    fs::write(dir.join("nested/b.json"), r#"[{"name": "Sanya Kapoor", "handle": "@sanya"}]"#).unwrap();
    fs::write(dir.join("broken.json"), "{ not json").unwrap();
    fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let outcome = DataProcessor::new().process_path(dir).expect("process dir");

    let names: Vec<&str> = outcome.documents.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Kabir Malhotra", "Sanya Kapoor"]);
}

#[test]
fn csv_rows_normalize_like_json_records() {
    let tmp = TempDir::new().unwrap();
    let file_path = tmp.path().join("influencers.CSV");
    fs::write(
        &file_path,
        "name,handle,followers,niche,sample_post,country\n\
         Kabir Malhotra,kabir,\"45,000\",\"Crypto, Finance\",Bitcoin   market analysis,IN\n\
         ,@nobody,,,,\n\
         Sanya Kapoor,@Sanya,1200,fitness,Morning workout routines\n",
    )
    .unwrap();

    let outcome = DataProcessor::new().process_path(&file_path).expect("process csv");

    assert_eq!(outcome.raw_count, 3);
    assert_eq!(outcome.documents.len(), 2);
    let kabir = &outcome.documents[0];
    assert_eq!(kabir.handle, "@kabir");
    assert_eq!(kabir.followers, Some(45_000));
    assert_eq!(kabir.niche, "crypto, finance");
    assert_eq!(kabir.sample_post, "Bitcoin market analysis");
    assert_eq!(kabir.extra.get("country"), Some(&serde_json::json!("IN")));
    let sanya = &outcome.documents[1];
    assert_eq!(sanya.handle, "@sanya");
    assert!(sanya.extra.get("country").is_none(), "short row leaves trailing columns absent");
}

#[test]
fn directory_walk_includes_csv_files() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.csv"), "name,handle,niche\nKabir Malhotra,@kabir,crypto\n").unwrap();
    fs::write(tmp.path().join("b.json"), r#"[{"name": "Sanya Kapoor", "handle": "@sanya"}]"#).unwrap();

    let outcome = DataProcessor::new().process_path(tmp.path()).expect("process dir");

    let handles: Vec<&str> = outcome.documents.iter().map(|d| d.handle.as_str()).collect();
    assert_eq!(handles, vec!["@kabir", "@sanya"]);
}

#[test]
fn long_posts_are_chunked_on_word_boundaries() {
    assert_eq!(
        chunk_text("Scaling seed-stage AI companies across India", 20),
        vec!["Scaling seed-stage", "AI companies across", "India"]
    );
    assert_eq!(chunk_text("short post", 20), vec!["short post"]);
    assert_eq!(chunk_text("overlongword", 4), vec!["overlongword"]);
    assert!(chunk_text("", 20).is_empty());

    let tmp = TempDir::new().unwrap();
    let raw = tmp.path().join("raw.json");
    fs::write(
        &raw,
        r#"[{"name": "Aarav Mehta", "handle": "@aarav", "sample_post": "Scaling seed-stage AI companies across India"},
            {"name": "No Post", "handle": "@nopost"}]"#,
    )
    .unwrap();
    let outcome = DataProcessor::new().with_max_chunk_len(20).process_path(&raw).unwrap();
    assert_eq!(outcome.documents[0].chunks.len(), 3);
    assert!(outcome.documents[1].chunks.is_empty());

    let out = tmp.path().join("processed.json");
    write_processed(&outcome.documents, &out).unwrap();
    assert_eq!(read_processed(&out).unwrap(), outcome.documents, "chunks survive the processed file");
    assert_eq!(DataSettings::default().max_chunk_len, 280);
}

#[test]
fn configured_paths_expand_env_vars() {
    std::env::set_var("RAGDB_TEST_DATA_ROOT", "/srv/ragdb");
    assert_eq!(expand_path("${RAGDB_TEST_DATA_ROOT}/store"), std::path::PathBuf::from("/srv/ragdb/store"));

    let data = DataSettings { persist_dir: "$RAGDB_TEST_DATA_ROOT/vectors".into(), ..DataSettings::default() };
    assert_eq!(data.persist_path(), std::path::PathBuf::from("/srv/ragdb/vectors"));
}

#[test]
fn missing_input_path_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = DataProcessor::new().process_path(&tmp.path().join("absent"));
    assert!(result.is_err());
}

#[test]
fn processed_file_round_trips() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("processed/processed.json");
    let docs = vec![Document::new("Aarav Mehta", "@aarav", "ai startups", "Scaling seed-stage AI companies")];

    write_processed(&docs, &out).expect("write");
    let back = read_processed(&out).expect("read");

    assert_eq!(back, docs);
}

#[test]
fn document_text_views() {
    let doc = Document::new("Sanya Kapoor", "@sanya", "fitness", "Morning workout routines");
    assert_eq!(doc.embedding_text(), "fitness. Morning workout routines");
    assert_eq!(doc.text_fields(), ["fitness", "Morning workout routines", "Sanya Kapoor", "@sanya"]);
}

#[test]
fn citation_serializes_flat() {
    let citation = Citation::new(Document::new("Kabir Malhotra", "@kabir", "crypto", "Bitcoin market analysis"), 0.5);
    let value = serde_json::to_value(&citation).unwrap();
    assert_eq!(value["name"], "Kabir Malhotra");
    assert_eq!(value["score"], 0.5);

    let back: Citation = serde_json::from_value(value).unwrap();
    assert_eq!(back, citation);
}

#[test]
fn config_defaults_and_overrides() {
    let defaults = Config::from_toml_str("").expect("defaults").settings().expect("settings");
    assert_eq!(defaults.retrieval.top_k, 3);
    assert_eq!(defaults.index.use_native, NativeMode::Auto);
    assert_eq!(defaults.embedding.model, "text-embedding-3-small");

    let config = Config::from_toml_str(
        r#"
        [index]
        use_native = false

        [retrieval]
        top_k = 5
        rerank = true
        "#,
    )
    .expect("config");
    let settings = config.settings().expect("settings");
    assert_eq!(settings.index.use_native, NativeMode::Off);
    assert_eq!(settings.retrieval.top_k, 5);
    assert!(settings.retrieval.rerank);
    assert_eq!(config.get::<usize>("index.batch_size").unwrap(), 64);
}

#[test]
fn config_accepts_tristate_strings_and_rejects_zero_top_k() {
    let settings = Config::from_toml_str("[index]\nuse_native = \"true\"").unwrap().settings().unwrap();
    assert_eq!(settings.index.use_native, NativeMode::On);

    assert!(Config::from_toml_str("[index]\nuse_native = \"sometimes\"").and_then(|c| c.settings()).is_err());
    assert!(Config::from_toml_str("[retrieval]\ntop_k = 0").is_err());
}

#[test]
fn provider_error_maps_http_status() {
    let body = r#"{"error": {"message": "bad key"}}"#;
    assert_eq!(ProviderError::from_status(401, body), ProviderError::Auth("bad key".into()));
    assert_eq!(ProviderError::from_status(429, "slow down"), ProviderError::RateLimit("slow down".into()));
    assert_eq!(ProviderError::from_status(500, "boom"), ProviderError::Other("HTTP 500: boom".into()));
}
