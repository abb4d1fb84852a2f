//! Batch inverted-index builder for large scientific-paper JSON corpora.
//!
//! Binary crate entry point. All CLI logic is in the `cli` module.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod cli;

fn main() {
    cli::run();
}
