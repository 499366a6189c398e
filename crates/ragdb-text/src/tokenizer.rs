use regex::Regex;
use std::sync::OnceLock;

/// Function words ignored when extracting key phrases.
pub const STOPWORDS: &[&str] = &[
	"the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
	"is", "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did",
	"will", "would", "could", "should", "may", "might", "can",
	"this", "that", "these", "those",
	"i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them",
];

fn word_regex() -> &'static Regex {
	static WORD: OnceLock<Regex> = OnceLock::new();
	WORD.get_or_init(|| Regex::new(r"\w+").expect("word pattern is valid"))
}

/// Lowercased `\w+` runs of `text`, in order, duplicates kept.
pub fn words(text: &str) -> Vec<String> {
	let lower = text.to_lowercase();
	word_regex().find_iter(&lower).map(|m| m.as_str().to_string()).collect()
}

pub fn is_stopword(word: &str) -> bool {
	STOPWORDS.contains(&word)
}

/// Words longer than two characters that are not stopwords.
pub fn key_words(text: &str) -> Vec<String> {
	words(text).into_iter().filter(|w| w.chars().count() > 2 && !is_stopword(w)).collect()
}

/// Query tokens for reranking: lowercased alphanumeric runs, first occurrence
/// order, no duplicates.
pub fn query_tokens(query: &str) -> Vec<String> {
	let mut tokens: Vec<String> = Vec::new();
	for token in query.to_lowercase().split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
		if !tokens.iter().any(|t| t == token) {
			tokens.push(token.to_string());
		}
	}
	tokens
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn words_are_lowercased_word_runs() {
		assert_eq!(words("Who talks about @Crypto_King's posts?"), vec!["who", "talks", "about", "crypto_king", "s", "posts"]);
	}

	#[test]
	fn key_words_drop_short_and_stop_words() {
		assert_eq!(key_words("The AI of this startup is on fire"), vec!["startup", "fire"]);
	}

	#[test]
	fn query_tokens_dedup_in_order() {
		assert_eq!(query_tokens("Crypto, crypto market!"), vec!["crypto", "market"]);
	}
}
