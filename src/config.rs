//! Build configuration threaded explicitly through every pipeline stage.
//!
//! No process-wide mutable state: the original Python scripts pointed
//! module-level globals (`ROOT_DIR`, `PDF_DIR`, `PMC_DIR`) at a dataset and
//! monkey-patched them for tests. `BuildConfig` replaces that with an
//! explicit value passed by reference.

use std::path::PathBuf;

/// Default number of regular barrels (`N`).
pub const DEFAULT_NUM_BARRELS: u32 = 16;

/// Default fraction of the corpus above which a token is "frequent".
pub const DEFAULT_FREQ_THRESHOLD: f64 = 0.05;

/// Default number of shard buckets used by the external-merge inverter.
pub const DEFAULT_BUCKET_COUNT: u32 = 128;

/// Default per-token in-memory cap before the postings consolidator spills
/// to disk. Matches `PER_TOKEN_INMEM_THRESHOLD` in the original scripts.
pub const DEFAULT_PER_TOKEN_THRESHOLD: usize = 1024;

/// Name of the structured-markup source subdirectory, visited first.
pub const STRUCTURED_SUBDIR: &str = "pmc_json";

/// Name of the PDF-extracted source subdirectory, visited second.
pub const PDF_SUBDIR: &str = "pdf_json";

/// Log a progress line every `LOG_EVERY` documents processed.
pub const LOG_EVERY: u64 = 50;

/// Log a progress line every `SCAN_LOG_EVERY` barrel records scanned.
pub const SCAN_LOG_EVERY: u64 = 10_000;

/// Log a progress line every `WRITE_LOG_EVERY` tokens consolidated.
pub const WRITE_LOG_EVERY: u64 = 1_000;

/// All tunables for one build, threaded explicitly rather than read from
/// process-global state.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Root directory containing `pmc_json/` and/or `pdf_json/`.
    pub input_dir: PathBuf,
    /// Directory all index artifacts are written into.
    pub output_dir: PathBuf,
    /// Number of regular barrels (`N`); the frequent barrel is `N` itself.
    pub num_barrels: u32,
    /// Fraction of `total_docs` above which a token is "frequent".
    pub freq_threshold: f64,
    /// Number of shard buckets for the external-merge inverter.
    pub bucket_count: u32,
    /// Per-token in-memory record cap before spilling in the consolidator.
    pub per_token_threshold: usize,
    /// Optional cap on the number of documents indexed (for testing).
    pub limit: Option<usize>,
}

impl BuildConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            num_barrels: DEFAULT_NUM_BARRELS,
            freq_threshold: DEFAULT_FREQ_THRESHOLD,
            bucket_count: DEFAULT_BUCKET_COUNT,
            per_token_threshold: DEFAULT_PER_TOKEN_THRESHOLD,
            limit: None,
        }
    }

    pub fn forward_index_path(&self) -> PathBuf {
        self.output_dir.join("forward_index.bin")
    }

    pub fn lexicon_path(&self) -> PathBuf {
        self.output_dir.join("lexicon.bin")
    }

    pub fn doc_ids_path(&self) -> PathBuf {
        self.output_dir.join("doc_ids.tsv")
    }

    pub fn inverted_index_path(&self) -> PathBuf {
        self.output_dir.join("inverted_index.bin")
    }

    pub fn barrel_mapping_path(&self) -> PathBuf {
        self.output_dir.join("barrel_mapping.bin")
    }

    pub fn barrels_dir(&self) -> PathBuf {
        self.output_dir.join("barrels")
    }

    pub fn barrel_path(&self, barrel_id: u32) -> PathBuf {
        self.barrels_dir().join(format!("barrel_{barrel_id:02}.bin"))
    }

    pub fn freq_barrel_path(&self) -> PathBuf {
        self.barrels_dir().join("barrel_freq.bin")
    }

    pub fn postings_index_path(&self) -> PathBuf {
        self.output_dir.join("postings_index.bin")
    }

    pub fn postings_offsets_path(&self) -> PathBuf {
        self.output_dir.join("postings_offsets.bin")
    }

    pub fn postings_tmp_dir(&self) -> PathBuf {
        self.output_dir.join(".postings_tmp")
    }

    pub fn bucket_tmp_dir(&self) -> PathBuf {
        self.output_dir.join(".bucket_tmp")
    }
}
