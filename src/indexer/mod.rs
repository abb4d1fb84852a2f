//! Index construction core: forward-index building, external bucketed
//! inversion, barrel partitioning, and postings consolidation.

pub mod barrels;
pub mod forward;
pub mod invert;
pub mod lexicon;
pub mod postings;
pub mod ranker;
pub mod tokenizer;

use crate::config::BuildConfig;
use crate::error::Result;

/// Summary statistics for a complete `forward` → `invert` → `barrels`
/// pipeline run.
#[derive(Debug, Default, Clone)]
pub struct BuildReport {
    pub forward: forward::ForwardIndexStats,
    pub invert: invert::InvertStats,
    pub barrels: barrels::BarrelStats,
    pub postings: postings::PostingsStats,
}

/// Run all four subsystems in sequence: forward-index construction,
/// bucketed inversion, barrel assignment + writing, and postings
/// consolidation. This is the `build` CLI subcommand's entry point.
pub fn run_build(config: &BuildConfig) -> Result<BuildReport> {
    let forward = forward::build_forward_index(config)?;
    let invert = invert::build_inverted_index(config)?;
    let (_mapping, barrel_stats) = barrels::build_barrels(config)?;
    let postings_stats = postings::build_postings(config)?;

    Ok(BuildReport {
        forward,
        invert,
        barrels: barrel_stats,
        postings: postings_stats,
    })
}
