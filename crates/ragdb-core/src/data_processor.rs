//! ETL for raw influencer records: load JSON or CSV files, normalize fields,
//! dedup, and split long posts into chunks.

use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::types::Document;

pub type RawRecord = Map<String, Value>;

/// Fields lifted into typed `Document` slots; everything else lands in `extra`.
const KNOWN_FIELDS: [&str; 8] = ["id", "name", "handle", "followers", "niche", "sample_post", "post", "chunks"];

/// Keys under which a JSON object may wrap its record list.
const WRAPPER_KEYS: [&str; 3] = ["data", "records", "items"];

#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    pub raw_count: usize,
    pub documents: Vec<Document>,
}

/// Default upper bound, in characters, of one post chunk.
pub const DEFAULT_MAX_CHUNK_LEN: usize = 280;

const DATASET_EXTENSIONS: [&str; 2] = ["json", "csv"];

pub struct DataProcessor {
    max_chunk_len: usize,
}

impl Default for DataProcessor {
    fn default() -> Self { Self { max_chunk_len: DEFAULT_MAX_CHUNK_LEN } }
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    /// Split posts longer than `max_chunk_len` characters into chunks.
    pub fn with_max_chunk_len(mut self, max_chunk_len: usize) -> Self {
        self.max_chunk_len = max_chunk_len.max(1);
        self
    }

    /// Load and normalize a JSON or CSV file, or every `*.json` / `*.csv`
    /// file under a directory.
    pub fn process_path(&self, path: &Path) -> Result<ProcessOutcome> {
        let raw = self.load_raw_records(path)?;
        let raw_count = raw.len();
        let documents = self.normalize(raw);
        info!(raw = raw_count, kept = documents.len(), path = %path.display(), "processed raw records");
        Ok(ProcessOutcome { raw_count, documents })
    }

    pub fn load_raw_records(&self, path: &Path) -> Result<Vec<RawRecord>> {
        if path.is_file() {
            return self.load_one_file(path);
        }
        if !path.is_dir() {
            return Err(crate::error::Error::NotFound(path.display().to_string()).into());
        }
        let mut records = Vec::new();
        for file in self.list_dataset_files(path) {
            match self.load_one_file(&file) {
                Ok(batch) => records.extend(batch),
                Err(e) => warn!(file = %file.display(), error = %e, "skipping unreadable dataset file"),
            }
        }
        Ok(records)
    }

    fn load_one_file(&self, path: &Path) -> Result<Vec<RawRecord>> {
        let is_csv = path.extension().and_then(|s| s.to_str()).is_some_and(|s| s.eq_ignore_ascii_case("csv"));
        if is_csv { self.load_csv(path) } else { self.load_json(path) }
    }

    fn load_json(&self, path: &Path) -> Result<Vec<RawRecord>> {
        let content = fs::read_to_string(path)?;
        let data: Value = serde_json::from_str(&content)?;
        let list = match data {
            Value::Array(items) => items,
            Value::Object(mut obj) => WRAPPER_KEYS
                .iter()
                .find_map(|k| match obj.remove(*k) {
                    Some(Value::Array(items)) => Some(items),
                    _ => None,
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        let records: Vec<RawRecord> = list
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(m) => Some(m),
                _ => None,
            })
            .collect();
        debug!(file = %path.display(), records = records.len(), "loaded dataset file");
        Ok(records)
    }

    /// One record per row, keyed by the header row. Short rows leave the
    /// trailing columns absent.
    fn load_csv(&self, path: &Path) -> Result<Vec<RawRecord>> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers = reader.headers()?.clone();
        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let record: RawRecord = headers
                .iter()
                .zip(row.iter())
                .map(|(key, value)| (key.trim().to_string(), Value::String(value.to_string())))
                .collect();
            records.push(record);
        }
        debug!(file = %path.display(), records = records.len(), "loaded csv dataset file");
        Ok(records)
    }

    /// Normalize raw records into documents.
    ///
    /// Records without a name or handle are dropped. Handles are lowercased and
    /// `@`-prefixed; the first record wins for a given handle. Posts longer
    /// than `max_chunk_len` are also split into word-boundary `chunks`.
    pub fn normalize(&self, records: Vec<RawRecord>) -> Vec<Document> {
        let mut seen_handles: HashSet<String> = HashSet::new();
        let mut documents = Vec::new();
        for rec in records {
            let name = clean_whitespace(&text_of(rec.get("name")));
            let handle = clean_whitespace(&text_of(rec.get("handle")));
            if name.is_empty() || handle.is_empty() { continue; }
            let handle = ensure_at_prefix(&handle.to_lowercase());
            if !seen_handles.insert(handle.clone()) { continue; }

            let mut sample_post = clean_whitespace(&text_of(rec.get("sample_post")));
            if sample_post.is_empty() { sample_post = clean_whitespace(&text_of(rec.get("post"))); }

            let extra = rec
                .iter()
                .filter(|(k, _)| !KNOWN_FIELDS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            let chunks = chunk_text(&sample_post, self.max_chunk_len);
            documents.push(Document {
                id: rec.get("id").filter(|v| !v.is_null()).map(|v| text_of(Some(v))),
                name,
                handle,
                niche: normalize_niche(rec.get("niche")),
                followers: rec.get("followers").and_then(parse_count),
                sample_post,
                chunks,
                extra,
            });
        }
        documents
    }

    fn list_dataset_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut dataset_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|s| DATASET_EXTENSIONS.iter().any(|e| s.eq_ignore_ascii_case(e)))
            })
            .collect();
        dataset_files.sort();
        dataset_files
    }
}

/// Write processed documents as pretty JSON, creating parent directories.
pub fn write_processed(documents: &[Document], output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() { fs::create_dir_all(parent)?; }
    fs::write(output, serde_json::to_string_pretty(documents)?)?;
    Ok(())
}

/// Read a processed dataset back (a JSON list of documents).
pub fn read_processed(path: &Path) -> Result<Vec<Document>> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

fn text_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn clean_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn ensure_at_prefix(handle: &str) -> String {
    if handle.starts_with('@') { handle.to_string() } else { format!("@{handle}") }
}

fn normalize_niche(value: Option<&Value>) -> String {
    let items: Vec<String> = match value {
        Some(Value::Array(xs)) => xs.iter().map(|x| text_of(Some(x))).collect(),
        other => text_of(other).split(',').map(str::to_string).collect(),
    };
    items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Greedy word packing into chunks of at most `max_len` characters. Text that
/// already fits is one chunk; a single overlong word becomes its own chunk.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    if text.is_empty() { return Vec::new(); }
    if text.chars().count() <= max_len { return vec![text.to_string()]; }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut length = 0;
    for token in text.split_whitespace() {
        let token_len = token.chars().count() + usize::from(length > 0);
        if length + token_len > max_len && !current.is_empty() {
            chunks.push(current.join(" "));
            current = vec![token];
            length = token.chars().count();
        } else {
            current.push(token);
            length += token_len;
        }
    }
    if !current.is_empty() { chunks.push(current.join(" ")); }
    chunks
}

fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    }
}
