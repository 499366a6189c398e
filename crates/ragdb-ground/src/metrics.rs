//! The three signals combined into the ungroundedness score. Each is in `[0, 1]`.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use ragdb_core::types::{Citation, Document};
use ragdb_text::words;

use crate::phrases::key_phrases;
use crate::similarity::gestalt_ratio;

/// Phrases at or below this similarity do not count as covered.
pub const FUZZY_MATCH_RATIO: f64 = 0.7;

const WHO_ANSWER_MARKERS: &[&str] = &["influencer", "handle", "@", "talks", "discuss"];
const CONTENT_QUERY_WORDS: &[&str] = &["content", "post", "tweet", "message"];
const CONTENT_ANSWER_WORDS: &[&str] = &["post", "tweet", "content", "message"];

fn handle_regex() -> &'static Regex {
    static HANDLE: OnceLock<Regex> = OnceLock::new();
    HANDLE.get_or_init(|| Regex::new(r"@(\w+)").expect("handle pattern is valid"))
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Fraction of the answer's key phrases that fuzzily match a key phrase of
/// some citation. Repeated answer phrases count once per occurrence.
pub fn citation_coverage(answer: &str, citations: &[Citation]) -> f64 {
    if citations.is_empty() { return 0.0; }
    let answer_phrases = key_phrases(answer);
    if answer_phrases.is_empty() { return 0.0; }

    let citation_phrases: HashSet<String> =
        citations.iter().flat_map(|c| key_phrases(&c.document.searchable_text())).collect();
    let covered = answer_phrases
        .iter()
        .filter(|phrase| {
            citation_phrases.contains(*phrase)
                || citation_phrases.iter().any(|c| gestalt_ratio(phrase, c) > FUZZY_MATCH_RATIO)
        })
        .count();
    covered as f64 / answer_phrases.len() as f64
}

/// Share of distinct query words echoed by the answer, raised for the query
/// shapes the assistant is built around (handle lookups, niche questions,
/// "who talks about", content questions).
pub fn query_relevance(query: &str, answer: &str) -> f64 {
    let query_words: HashSet<String> = words(query).into_iter().collect();
    if query_words.is_empty() { return 0.0; }
    let answer_words: HashSet<String> = words(answer).into_iter().collect();
    let base = query_words.intersection(&answer_words).count() as f64 / query_words.len() as f64;

    let query_lower = query.to_lowercase();
    let answer_lower = answer.to_lowercase();

    if query.contains('@') && query_lower.contains("handle") {
        if let Some(handle) = handle_regex().captures(query).and_then(|c| c.get(1)) {
            if answer_lower.contains(&handle.as_str().to_lowercase()) {
                return 1.0;
            }
            if contains_any(&answer_lower, &["not found", "no information"]) {
                return 0.8;
            }
        }
    }

    if query_lower.contains("niche") && answer_lower.contains("niche") {
        return base.max(0.9);
    }

    let asks_who = query_lower.contains("who") && contains_any(&query_lower, &["talks", "discuss"]);
    if asks_who && contains_any(&answer_lower, WHO_ANSWER_MARKERS) {
        return base.max(0.8);
    }

    if contains_any(&query_lower, CONTENT_QUERY_WORDS) && contains_any(&answer_lower, CONTENT_ANSWER_WORDS) {
        return base.max(0.8);
    }

    base
}

/// `0.4·mean(score) + 0.3·diversity + 0.3·completeness`.
pub fn citation_quality(citations: &[Citation]) -> f64 {
    if citations.is_empty() { return 0.0; }
    let n = citations.len() as f64;

    let mean_score = citations.iter().map(|c| f64::from(c.score)).sum::<f64>() / n;
    let distinct: HashSet<String> = citations.iter().map(|c| c.document.embedding_text()).collect();
    let diversity = distinct.len() as f64 / n;
    let completeness = citations.iter().map(|c| field_completeness(&c.document)).sum::<f64>() / n;

    mean_score * 0.4 + diversity * 0.3 + completeness * 0.3
}

/// Fraction of name, handle, niche and sample post that are non-empty.
pub fn field_completeness(doc: &Document) -> f64 {
    let filled = [&doc.name, &doc.handle, &doc.niche, &doc.sample_post].iter().filter(|f| !f.is_empty()).count();
    filled as f64 * 0.25
}
