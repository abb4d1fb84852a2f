//! CLI argument structs for all subcommands.

use clap::Parser;

use corpus_index::config::{
    DEFAULT_BUCKET_COUNT, DEFAULT_FREQ_THRESHOLD, DEFAULT_NUM_BARRELS, DEFAULT_PER_TOKEN_THRESHOLD,
};

/// Shared tuning flags accepted by every subcommand that touches barrels
/// or the bucketed inverter. Subcommands that don't need a given knob
/// simply ignore it (e.g. `forward` ignores `--num-barrels`).
#[derive(Parser, Debug, Clone)]
pub struct TuningArgs {
    /// Number of regular barrels tokens are distributed across.
    #[arg(long, default_value_t = DEFAULT_NUM_BARRELS)]
    pub num_barrels: u32,

    /// Fraction of total_docs above which a token is "frequent".
    #[arg(long, default_value_t = DEFAULT_FREQ_THRESHOLD)]
    pub freq_threshold: f64,

    /// Number of shard buckets used by the external-merge inverter.
    #[arg(long, default_value_t = DEFAULT_BUCKET_COUNT)]
    pub bucket_count: u32,

    /// Per-token in-memory record cap before the postings consolidator
    /// spills to disk.
    #[arg(long, default_value_t = DEFAULT_PER_TOKEN_THRESHOLD)]
    pub per_token_threshold: usize,

    /// Number of worker threads accepted for CLI forward-compatibility;
    /// the pipeline is single-threaded by default and this flag is
    /// currently a no-op (see DESIGN.md).
    #[arg(short, long, default_value_t = 0)]
    pub threads: usize,

    /// Optional cap on the number of documents indexed (for testing).
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Build the forward index, lexicon, and doc_ids mapping.
#[derive(Parser, Debug)]
pub struct ForwardArgs {
    /// Root directory containing `pmc_json/` and/or `pdf_json/`.
    #[arg(long)]
    pub input_dir: String,

    /// Directory index artifacts are written into.
    #[arg(long)]
    pub output_dir: String,

    #[command(flatten)]
    pub tuning: TuningArgs,
}

/// Build the doc-only inverted index from an existing forward index.
#[derive(Parser, Debug)]
pub struct InvertArgs {
    /// Directory containing `forward_index.bin` and where
    /// `inverted_index.bin` will be written.
    #[arg(long)]
    pub output_dir: String,

    #[command(flatten)]
    pub tuning: TuningArgs,
}

/// Assign barrels, write positional barrel files, and consolidate into
/// the final postings index.
#[derive(Parser, Debug)]
pub struct BarrelsArgs {
    /// Directory containing `forward_index.bin` and where barrel/postings
    /// artifacts will be written.
    #[arg(long)]
    pub output_dir: String,

    #[command(flatten)]
    pub tuning: TuningArgs,
}

/// Run `forward`, `invert`, and `barrels` in sequence.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Root directory containing `pmc_json/` and/or `pdf_json/`.
    #[arg(long)]
    pub input_dir: String,

    /// Directory all index artifacts are written into.
    #[arg(long)]
    pub output_dir: String,

    #[command(flatten)]
    pub tuning: TuningArgs,
}
