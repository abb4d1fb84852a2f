//! # corpus-index — batch inverted-index builder for scientific-paper corpora
//!
//! Transforms a directory tree of per-document JSON files into a compact
//! on-disk inverted index with per-token positional postings, suitable for
//! subsequent query-time retrieval. See `DESIGN.md` for the full design.
//!
//! ## Library usage
//!
//! This crate is primarily a CLI tool, but the indexer's core stages are
//! exposed as a library for integration tests and benchmarking.

pub mod config;
pub mod error;
pub mod indexer;

pub use config::BuildConfig;
pub use error::IndexError;
pub use indexer::{run_build, BuildReport};

// ─── Property-based tests (proptest) ─────────────────────────────────

#[cfg(test)]
mod property_tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use crate::indexer::barrels::assign_barrels;
    use crate::indexer::tokenizer::{default_stopwords, tokenize};

    #[test]
    fn tokenize_empty_input_yields_no_tokens() {
        assert!(tokenize("", &default_stopwords()).is_empty());
    }

    // ─── Tokenizer invariants ────────────────────────────────────

    proptest! {
        /// Tokenizer always produces lowercase output regardless of input case.
        #[test]
        fn tokenize_always_lowercase(input in "\\PC{1,200}") {
            let stopwords = default_stopwords();
            let tokens = tokenize(&input, &stopwords);
            for token in &tokens {
                prop_assert_eq!(token, &token.to_lowercase(),
                    "token '{}' is not lowercase", token);
            }
        }

        /// Tokenizer output is deterministic — same input always gives same output.
        #[test]
        fn tokenize_is_deterministic(input in "\\PC{1,200}") {
            let stopwords = default_stopwords();
            let result1 = tokenize(&input, &stopwords);
            let result2 = tokenize(&input, &stopwords);
            prop_assert_eq!(result1, result2);
        }

        /// No emitted token is ever empty, and every character in it is
        /// Unicode-alphanumeric (runs are flushed on any other character).
        #[test]
        fn tokenize_never_emits_empty_or_non_alnum_tokens(input in "\\PC{0,200}") {
            let no_stopwords = std::collections::HashSet::new();
            let tokens = tokenize(&input, &no_stopwords);
            for token in &tokens {
                prop_assert!(!token.is_empty());
                prop_assert!(token.chars().all(|c| c.is_alphanumeric()));
            }
        }

        /// A stopword list that swallows every token yields an empty result.
        #[test]
        fn tokenize_drops_every_listed_stopword(word in "[a-z]{1,12}") {
            let mut stopwords = std::collections::HashSet::new();
            stopwords.insert(word.clone());
            let tokens = tokenize(&word, &stopwords);
            prop_assert!(tokens.is_empty());
        }
    }

    // ─── Barrel assignment invariants ────────────────────────────

    proptest! {
        /// Every token that crosses the frequent threshold lands in the
        /// special frequent barrel; every other token lands strictly inside
        /// `[0, num_barrels)`.
        #[test]
        fn assign_barrels_partitions_by_threshold(
            total_docs in 10u32..2_000,
            num_tokens in 1usize..200,
            num_barrels in 1u32..32,
        ) {
            let mut doc_freq = HashMap::new();
            for tid in 0..num_tokens as u32 {
                // Deterministic pseudo-frequency spread across [1, total_docs].
                let freq = 1 + (tid.wrapping_mul(2654435761) % total_docs.max(1));
                doc_freq.insert(tid, freq);
            }

            let mapping = assign_barrels(&doc_freq, total_docs, num_barrels, 0.05);
            let threshold_docs = (((total_docs as f64) * 0.05).floor() as u32).max(1);

            for (&tid, &freq) in &doc_freq {
                let barrel = mapping.barrel_for(tid);
                if freq >= threshold_docs {
                    prop_assert_eq!(barrel, mapping.special_frequent_id);
                } else {
                    prop_assert!(barrel < num_barrels, "barrel {} not < {}", barrel, num_barrels);
                }
            }

            // Every token submitted gets exactly one mapping entry.
            prop_assert_eq!(mapping.mapping.len(), doc_freq.len());
        }

        /// Assignment is deterministic given the same inputs.
        #[test]
        fn assign_barrels_is_deterministic(
            total_docs in 10u32..500,
            num_tokens in 1usize..50,
        ) {
            let mut doc_freq = HashMap::new();
            for tid in 0..num_tokens as u32 {
                doc_freq.insert(tid, 1 + (tid % total_docs.max(1)));
            }
            let a = assign_barrels(&doc_freq, total_docs, 16, 0.05);
            let b = assign_barrels(&doc_freq, total_docs, 16, 0.05);
            prop_assert_eq!(a.mapping, b.mapping);
        }
    }
}
