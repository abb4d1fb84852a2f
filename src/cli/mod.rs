//! CLI layer: argument parsing, command dispatch, and subcommand implementations.

pub mod args;

use clap::{Parser, Subcommand};

use corpus_index::config::BuildConfig;
use corpus_index::error::IndexError;
use corpus_index::indexer::{barrels, forward, invert, postings};

use args::{BarrelsArgs, BuildArgs, ForwardArgs, InvertArgs, TuningArgs};

/// Batch inverted-index builder for large scientific-paper JSON corpora.
#[derive(Parser, Debug)]
#[command(name = "corpus-index", version, about, after_help = "\
Run 'corpus-index <COMMAND> --help' for detailed options.\n\
Typical usage: corpus-index build --input-dir <DIR> --output-dir <DIR>")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Build the forward index, lexicon, and doc_ids mapping.
    Forward(ForwardArgs),

    /// Build the doc-only inverted index from an existing forward index.
    Invert(InvertArgs),

    /// Assign barrels, write positional barrel files, and consolidate
    /// into the final postings index.
    Barrels(BarrelsArgs),

    /// Run forward, invert, and barrels in sequence.
    Build(BuildArgs),
}

fn config_from_tuning(input_dir: &str, output_dir: &str, tuning: &TuningArgs) -> BuildConfig {
    let mut config = BuildConfig::new(input_dir, output_dir);
    config.num_barrels = tuning.num_barrels;
    config.freq_threshold = tuning.freq_threshold;
    config.bucket_count = tuning.bucket_count;
    config.per_token_threshold = tuning.per_token_threshold;
    config.limit = tuning.limit;
    config
}

pub fn run() {
    init_logging();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Forward(args) => cmd_forward(args),
        Commands::Invert(args) => cmd_invert(args),
        Commands::Barrels(args) => cmd_barrels(args),
        Commands::Build(args) => cmd_build(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_forward(args: ForwardArgs) -> Result<(), IndexError> {
    let config = config_from_tuning(&args.input_dir, &args.output_dir, &args.tuning);
    let stats = forward::build_forward_index(&config)?;
    eprintln!(
        "forward: {} docs indexed ({} skipped), {} unique terms, {:.2} avg tokens/doc",
        stats.documents_indexed, stats.docs_skipped, stats.unique_terms, stats.avg_doc_length
    );
    Ok(())
}

fn cmd_invert(args: InvertArgs) -> Result<(), IndexError> {
    let config = config_from_tuning(&args.output_dir, &args.output_dir, &args.tuning);
    let stats = invert::build_inverted_index(&config)?;
    eprintln!(
        "invert: {} tokens, {} total postings",
        stats.vocab_size, stats.total_postings
    );
    Ok(())
}

fn cmd_barrels(args: BarrelsArgs) -> Result<(), IndexError> {
    let config = config_from_tuning(&args.output_dir, &args.output_dir, &args.tuning);
    let (mapping, stats) = barrels::build_barrels(&config)?;
    let postings_stats = postings::build_postings(&config)?;
    eprintln!(
        "barrels: {} docs, {} tokens assigned across {} regular barrels + 1 frequent barrel",
        stats.total_docs, stats.tokens_assigned, mapping.num_regular_barrels
    );
    eprintln!(
        "postings: {} unique tokens, {} total positional records",
        postings_stats.unique_tokens, postings_stats.total_postings
    );
    Ok(())
}

fn cmd_build(args: BuildArgs) -> Result<(), IndexError> {
    let config = config_from_tuning(&args.input_dir, &args.output_dir, &args.tuning);
    let report = corpus_index::run_build(&config)?;
    eprintln!(
        "build complete: {} docs, {} unique terms, {} tokens in inverted index, {} tokens consolidated",
        report.forward.documents_indexed,
        report.forward.unique_terms,
        report.invert.vocab_size,
        report.postings.unique_tokens,
    );
    Ok(())
}
