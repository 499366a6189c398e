use ragdb_core::types::Document;

/// Case-insensitive substring test of `query` against the document's
/// niche, sample post, name and handle. A blank query never matches.
pub fn matches_keyword(query: &str, doc: &Document) -> bool {
	let needle = query.trim().to_lowercase();
	if needle.is_empty() { return false; }
	doc.text_fields().iter().any(|field| field.to_lowercase().contains(&needle))
}

/// Documents matching `query` in stored order.
pub fn keyword_matches<'a>(query: &str, docs: &'a [Document]) -> Vec<&'a Document> {
	docs.iter().filter(|doc| matches_keyword(query, doc)).collect()
}
