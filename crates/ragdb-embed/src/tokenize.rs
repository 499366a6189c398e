use std::hash::Hasher;
use twox_hash::XxHash64;

/// Lowercased whitespace tokens, in order.
pub fn whitespace_tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().map(str::to_lowercase)
}

/// Feature-hashing bucket for a token: `xxh64(token, seed 0) mod dim`.
pub fn bucket(token: &str, dim: usize) -> usize {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(token.as_bytes());
    (hasher.finish() % dim as u64) as usize
}
