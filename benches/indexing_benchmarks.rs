//! Criterion benchmarks for indexing pipeline core operations.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the core operations in isolation, using
//! synthetic corpora so results are reproducible across machines.

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::tempdir;

use corpus_index::config::BuildConfig;
use corpus_index::indexer::barrels::{assign_barrels, build_barrels};
use corpus_index::indexer::forward::{write_forward_index, ForwardRecord};
use corpus_index::indexer::invert::build_inverted_index;
use corpus_index::indexer::postings::build_postings;
use corpus_index::indexer::tokenizer::{default_stopwords, tokenize};

fn synthetic_text(word_count: usize) -> String {
    (0..word_count)
        .map(|i| format!("token{}", i % 500))
        .collect::<Vec<_>>()
        .join(" ")
}

fn synthetic_forward_records(num_docs: usize, tokens_per_doc: usize, vocab: u32) -> Vec<ForwardRecord> {
    (0..num_docs)
        .map(|doc_id| {
            let token_ids = (0..tokens_per_doc)
                .map(|t| ((doc_id as u32).wrapping_mul(31).wrapping_add(t as u32)) % vocab)
                .collect();
            ForwardRecord { doc_id: doc_id as u32, token_ids }
        })
        .collect()
}

fn bench_tokenize(c: &mut Criterion) {
    let stopwords = default_stopwords();
    let mut group = c.benchmark_group("tokenize");
    for &size in &[100usize, 1_000, 10_000] {
        let text = synthetic_text(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| tokenize(black_box(text), &stopwords));
        });
    }
    group.finish();
}

fn bench_assign_barrels(c: &mut Criterion) {
    let mut doc_freq = HashMap::new();
    for tid in 0..5_000u32 {
        doc_freq.insert(tid, (tid % 200) + 1);
    }

    c.bench_function("assign_barrels_5000_tokens", |b| {
        b.iter(|| assign_barrels(black_box(&doc_freq), 1_000, 16, 0.05));
    });
}

fn bench_invert_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("invert_pipeline");
    for &num_docs in &[100usize, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(num_docs), &num_docs, |b, &num_docs| {
            b.iter_batched(
                || {
                    let dir = tempdir().unwrap();
                    let records = synthetic_forward_records(num_docs, 50, 500);
                    write_forward_index(&records, &dir.path().join("forward_index.bin")).unwrap();
                    (dir, BuildConfig::new(".", "."))
                },
                |(dir, mut config)| {
                    config.output_dir = dir.path().to_path_buf();
                    config.input_dir = dir.path().to_path_buf();
                    build_inverted_index(&config).unwrap();
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_barrels_and_postings(c: &mut Criterion) {
    c.bench_function("barrels_and_postings_500_docs", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let records = synthetic_forward_records(500, 60, 800);
                write_forward_index(&records, &dir.path().join("forward_index.bin")).unwrap();
                let mut config = BuildConfig::new(dir.path(), dir.path());
                config.num_barrels = 8;
                (dir, config)
            },
            |(_dir, config)| {
                build_barrels(&config).unwrap();
                build_postings(&config).unwrap();
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_tokenize,
    bench_assign_barrels,
    bench_invert_pipeline,
    bench_barrels_and_postings
);
criterion_main!(benches);
