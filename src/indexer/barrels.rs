//! Barrel assigner and writer.
//!
//! Two passes over the forward index: first compute per-token document
//! frequency and assign each token to a barrel by a frequency-aware
//! scheme, then re-stream the forward index writing positional postings
//! into the assigned barrel files.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::{BuildConfig, SCAN_LOG_EVERY};
use crate::error::Result;
use crate::indexer::forward::ForwardIndexReader;

/// `token_id → barrel_id`, where `barrel_id == num_regular_barrels` is the
/// special frequent barrel.
#[derive(Debug, Clone)]
pub struct BarrelMapping {
    pub num_regular_barrels: u32,
    pub special_frequent_id: u32,
    pub mapping: BTreeMap<u32, u32>,
}

impl BarrelMapping {
    pub fn barrel_for(&self, token_id: u32) -> u32 {
        *self.mapping.get(&token_id).unwrap_or(&self.special_frequent_id)
    }

    pub fn write_binary(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);
        w.write_all(&self.num_regular_barrels.to_le_bytes())?;
        w.write_all(&self.special_frequent_id.to_le_bytes())?;
        w.write_all(&(self.mapping.len() as u32).to_le_bytes())?;
        for (&token_id, &barrel_id) in &self.mapping {
            w.write_all(&token_id.to_le_bytes())?;
            w.write_all(&barrel_id.to_le_bytes())?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn read_binary(path: &Path) -> Result<Self> {
        use std::io::Read;
        let mut file = File::open(path)?;
        let mut buf4 = [0u8; 4];
        file.read_exact(&mut buf4)?;
        let num_regular_barrels = u32::from_le_bytes(buf4);
        file.read_exact(&mut buf4)?;
        let special_frequent_id = u32::from_le_bytes(buf4);
        file.read_exact(&mut buf4)?;
        let count = u32::from_le_bytes(buf4);

        let mut mapping = BTreeMap::new();
        for _ in 0..count {
            file.read_exact(&mut buf4)?;
            let token_id = u32::from_le_bytes(buf4);
            file.read_exact(&mut buf4)?;
            let barrel_id = u32::from_le_bytes(buf4);
            mapping.insert(token_id, barrel_id);
        }

        Ok(Self { num_regular_barrels, special_frequent_id, mapping })
    }
}

/// Compute document frequency per token by scanning the forward index
/// once, counting each token at most once per document.
pub fn compute_doc_frequencies(forward_path: &Path) -> Result<(HashMap<u32, u32>, u32)> {
    let mut counts: HashMap<u32, u32> = HashMap::new();
    let mut reader = ForwardIndexReader::open(forward_path)?;
    let mut total_docs: u32 = 0;

    while let Some(record) = reader.next_record()? {
        let unique: HashSet<u32> = record.token_ids.iter().copied().collect();
        for tid in unique {
            *counts.entry(tid).or_insert(0) += 1;
        }
        total_docs += 1;
        if total_docs as u64 % SCAN_LOG_EVERY == 0 {
            tracing::info!(total_docs, tokens_observed = counts.len(), "barrel assigner: scanning");
        }
    }
    reader.finish()?;

    Ok((counts, total_docs))
}

/// Assign every token in `doc_freq` to a barrel:
/// tokens at or above `threshold_docs = max(1, floor(total_docs *
/// freq_threshold))` go to the special frequent barrel; the rest are
/// sorted ascending by `(doc_freq, token_id)` and distributed by the
/// concave percentile transform `floor((i/R)^0.6 * N)`.
pub fn assign_barrels(
    doc_freq: &HashMap<u32, u32>,
    total_docs: u32,
    num_barrels: u32,
    freq_threshold: f64,
) -> BarrelMapping {
    let threshold_docs = (((total_docs as f64) * freq_threshold).floor() as u32).max(1);

    let mut sorted: Vec<(u32, u32)> = doc_freq.iter().map(|(&tid, &cnt)| (tid, cnt)).collect();
    sorted.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut mapping = BTreeMap::new();
    let mut remaining: Vec<(u32, u32)> = Vec::new();

    for (tid, cnt) in sorted {
        if cnt >= threshold_docs {
            mapping.insert(tid, num_barrels);
        } else {
            remaining.push((tid, cnt));
        }
    }

    let total_remaining = remaining.len();
    for (idx, (tid, _cnt)) in remaining.into_iter().enumerate() {
        let percentile = idx as f64 / total_remaining as f64;
        let barrel_idx = (percentile.powf(0.6) * num_barrels as f64).floor() as u32;
        let barrel_idx = barrel_idx.min(num_barrels.saturating_sub(1));
        mapping.insert(tid, barrel_idx);
    }

    BarrelMapping { num_regular_barrels: num_barrels, special_frequent_id: num_barrels, mapping }
}

/// Per-document positional posting records, one barrel file per
/// `barrel_id` plus the dedicated frequent barrel, append-only.
struct BarrelWriter {
    files: Vec<BufWriter<File>>, // index 0..num_barrels-1 regular, last is frequent
    num_barrels: u32,
}

impl BarrelWriter {
    fn open(config: &BuildConfig) -> Result<Self> {
        std::fs::create_dir_all(config.barrels_dir())?;
        let mut files = Vec::with_capacity(config.num_barrels as usize + 1);
        for b in 0..config.num_barrels {
            files.push(BufWriter::new(File::create(config.barrel_path(b))?));
        }
        files.push(BufWriter::new(File::create(config.freq_barrel_path())?));
        Ok(Self { files, num_barrels: config.num_barrels })
    }

    fn write_posting(&mut self, token_id: u32, doc_id: u32, freq: u32, positions: &[u32], barrel_id: u32) -> Result<()> {
        let idx = if barrel_id >= self.num_barrels {
            self.num_barrels as usize
        } else {
            barrel_id as usize
        };
        let w = &mut self.files[idx];
        w.write_all(&token_id.to_le_bytes())?;
        w.write_all(&doc_id.to_le_bytes())?;
        w.write_all(&freq.to_le_bytes())?;
        w.write_all(&(positions.len() as u32).to_le_bytes())?;
        for &p in positions {
            w.write_all(&p.to_le_bytes())?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        for w in &mut self.files {
            w.flush()?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct BarrelStats {
    pub total_docs: u32,
    pub tokens_assigned: usize,
    pub unique_tokens_seen: usize,
}

/// Run the full barrel-assignment and barrel-writing phase. Returns the
/// `BarrelMapping` alongside summary statistics;
/// `barrel_mapping.bin` and every `barrels/barrel_*.bin` file are written
/// as a side effect.
pub fn build_barrels(config: &BuildConfig) -> Result<(BarrelMapping, BarrelStats)> {
    let forward_path = config.forward_index_path();

    tracing::info!("barrel assigner: pass 1 (document frequency)");
    let (doc_freq, total_docs) = compute_doc_frequencies(&forward_path)?;

    let mapping = assign_barrels(&doc_freq, total_docs, config.num_barrels, config.freq_threshold);
    mapping.write_binary(&config.barrel_mapping_path())?;

    tracing::info!(
        num_regular_barrels = mapping.num_regular_barrels,
        tokens = mapping.mapping.len(),
        "barrel mapping written"
    );

    tracing::info!("barrel writer: pass 2 (positional postings)");
    let mut writer = BarrelWriter::open(config)?;
    let mut reader = ForwardIndexReader::open(&forward_path)?;
    let mut docs_written: u64 = 0;

    while let Some(record) = reader.next_record()? {
        // Insertion-ordered grouping: first-occurrence order of each token
        // within the document, matching the original's `defaultdict(list)`
        // iterated via `.items()`. A `HashMap` here would make barrel record
        // interleaving vary run-to-run, breaking byte-identical rebuilds.
        let mut order: Vec<u32> = Vec::new();
        let mut positions_by_token: HashMap<u32, Vec<u32>> = HashMap::new();
        for (pos, &tid) in record.token_ids.iter().enumerate() {
            let positions = positions_by_token.entry(tid).or_insert_with(|| {
                order.push(tid);
                Vec::new()
            });
            positions.push(pos as u32);
        }

        for tid in &order {
            let positions = &positions_by_token[tid];
            let barrel_id = mapping.barrel_for(*tid);
            writer.write_posting(*tid, record.doc_id, positions.len() as u32, positions, barrel_id)?;
        }

        docs_written += 1;
        if docs_written % SCAN_LOG_EVERY == 0 {
            tracing::info!(docs_written, total_docs, "barrel writer progress");
        }
    }
    reader.finish()?;
    writer.finish()?;

    let stats = BarrelStats {
        total_docs,
        tokens_assigned: mapping.mapping.len(),
        unique_tokens_seen: doc_freq.len(),
    };

    Ok((mapping, stats))
}
