use ragdb_text::key_words;

/// Key words of `text` followed by the bigrams of consecutive key words.
pub fn key_phrases(text: &str) -> Vec<String> {
    let words = key_words(text);
    let bigrams: Vec<String> = words.windows(2).map(|w| format!("{} {}", w[0], w[1])).collect();
    let mut phrases = words;
    phrases.extend(bigrams);
    phrases
}

#[cfg(test)]
mod tests {
    use super::key_phrases;

    #[test]
    fn words_then_bigrams() {
        assert_eq!(
            key_phrases("Kabir posts bitcoin analysis"),
            vec!["kabir", "posts", "bitcoin", "analysis", "kabir posts", "posts bitcoin", "bitcoin analysis"]
        );
        assert!(key_phrases("it is on").is_empty());
    }
}
