use ragdb_core::types::{Citation, Document};
use ragdb_text::{keyword_matches, matches_keyword, rerank_by_overlap};

fn docs() -> Vec<Document> {
	vec![
		Document::new("Aarav Mehta", "@aarav", "AI startups", "Scaling seed-stage AI companies"),
		Document::new("Sanya Kapoor", "@sanya", "fitness", "Morning workout routines"),
		Document::new("Kabir Malhotra", "@kabir", "crypto", "Bitcoin market analysis"),
	]
}

#[test]
fn keyword_scan_is_case_insensitive_over_all_text_fields() {
	let docs = docs();
	let by_niche: Vec<&str> = keyword_matches("CRYPTO", &docs).iter().map(|d| d.name.as_str()).collect();
	assert_eq!(by_niche, vec!["Kabir Malhotra"]);

	assert!(matches_keyword("@sanya", &docs[1]));
	assert!(matches_keyword("seed-stage", &docs[0]));
	assert!(keyword_matches("pizza", &docs).is_empty());
}

#[test]
fn blank_query_never_matches() {
	let docs = docs();
	assert!(keyword_matches("", &docs).is_empty());
	assert!(keyword_matches("   ", &docs).is_empty());
}

#[test]
fn rerank_orders_by_token_overlap_and_is_stable() {
	let citations: Vec<Citation> = docs().into_iter().zip([0.9, 0.8, 0.7]).map(|(d, s)| Citation::new(d, s)).collect();

	let reranked = rerank_by_overlap("bitcoin market morning", citations.clone());
	let names: Vec<&str> = reranked.iter().map(|c| c.document.name.as_str()).collect();
	assert_eq!(names, vec!["Kabir Malhotra", "Sanya Kapoor", "Aarav Mehta"]);
	assert_eq!(reranked[0].score, 0.7, "scores are not rewritten");

	let untouched = rerank_by_overlap("pizza", citations.clone());
	assert_eq!(untouched, citations);
}
