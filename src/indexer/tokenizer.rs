//! Tokenizer & stopword filter.
//!
//! NFKC-normalizes and case-folds text, then walks the normalized stream
//! emitting maximal runs of Unicode-alphanumeric characters, dropping any
//! run that is a stopword.

use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

/// Default built-in stopword list, mirroring the original Python indexer's
/// minimal set.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "while", "to", "of", "in",
    "for", "on", "with", "as", "by", "is", "it", "this", "that", "be",
    "are", "from",
];

pub fn default_stopwords() -> HashSet<String> {
    DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect()
}

/// Tokenize `text`: NFKC-normalize, fold case, split on non-alphanumeric
/// boundaries, and drop stopwords. Preserves occurrence order; positions
/// are implicit in the returned `Vec`'s indices.
pub fn tokenize(text: &str, stopwords: &HashSet<String>) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in text.nfkc() {
        let folded: Vec<char> = ch.to_lowercase().collect();
        let is_alnum = folded.iter().all(|c| c.is_alphanumeric());
        if is_alnum && !folded.is_empty() {
            current.extend(folded);
        } else {
            flush(&mut current, stopwords, &mut tokens);
        }
    }
    flush(&mut current, stopwords, &mut tokens);

    tokens
}

fn flush(current: &mut String, stopwords: &HashSet<String>, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        if !stopwords.contains(current.as_str()) {
            tokens.push(std::mem::take(current));
        } else {
            current.clear();
        }
    }
}
