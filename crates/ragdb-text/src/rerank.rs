use ragdb_core::types::Citation;

use crate::tokenizer::query_tokens;

/// Number of `tokens` that occur as substrings of `haystack` (already lowercased).
pub fn overlap_count(tokens: &[String], haystack: &str) -> usize {
	tokens.iter().filter(|t| haystack.contains(t.as_str())).count()
}

/// Stable reorder of `citations` by how many distinct query tokens appear in
/// each citation's text fields, most first. Scores are left untouched.
pub fn rerank_by_overlap(query: &str, citations: Vec<Citation>) -> Vec<Citation> {
	let tokens = query_tokens(query);
	if tokens.is_empty() { return citations; }
	let mut keyed: Vec<(usize, Citation)> = citations
		.into_iter()
		.map(|c| (overlap_count(&tokens, &c.document.searchable_text().to_lowercase()), c))
		.collect();
	keyed.sort_by(|a, b| b.0.cmp(&a.0));
	keyed.into_iter().map(|(_, c)| c).collect()
}
