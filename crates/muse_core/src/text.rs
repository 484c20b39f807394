//! Tokenization shared by classification, memory scoring and pattern mining.

use std::collections::BTreeSet;

/// Minimum length (exclusive) for a token to become a memory association.
const ASSOCIATION_MIN_LEN: usize = 3;

/// Lowercase words, split on anything that is not alphanumeric.
pub fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tokens longer than three characters made only of letters.
pub fn association_tokens(text: &str) -> BTreeSet<String> {
    words(text)
        .into_iter()
        .filter(|w| w.chars().count() > ASSOCIATION_MIN_LEN && w.chars().all(char::is_alphabetic))
        .collect()
}

pub fn sentence_terminators(text: &str) -> usize {
    text.chars().filter(|c| matches!(c, '.' | '!' | '?')).count()
}

/// True when the two texts share at least one word.
pub fn shares_token(a: &[String], b: &str) -> bool {
    let other = words(b);
    a.iter().any(|w| other.contains(w))
}
