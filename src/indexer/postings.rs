//! Postings consolidator.
//!
//! Scans every barrel file, accumulating positional records per token with
//! a bounded in-memory cap; when a token's list reaches the cap it is
//! spilled to a per-token temp file. The write phase then emits a single
//! token-keyed `postings_index.bin` plus a `postings_offsets.bin`
//! random-access table, atomically replacing any prior generation.

use std::collections::{BTreeSet, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::config::{BuildConfig, WRITE_LOG_EVERY};
use crate::error::Result;

/// One positional occurrence of a token in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalRecord {
    pub doc_id: u32,
    pub freq: u32,
    pub positions: Vec<u32>,
}

fn write_record(w: &mut impl Write, record: &PositionalRecord) -> Result<()> {
    w.write_all(&record.doc_id.to_le_bytes())?;
    w.write_all(&record.freq.to_le_bytes())?;
    w.write_all(&(record.positions.len() as u32).to_le_bytes())?;
    for &p in &record.positions {
        w.write_all(&p.to_le_bytes())?;
    }
    Ok(())
}

fn read_record(r: &mut impl Read) -> Result<Option<PositionalRecord>> {
    let mut hdr = [0u8; 12];
    match r.read_exact(&mut hdr) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let doc_id = u32::from_le_bytes(hdr[0..4].try_into().unwrap());
    let freq = u32::from_le_bytes(hdr[4..8].try_into().unwrap());
    let positions_count = u32::from_le_bytes(hdr[8..12].try_into().unwrap());

    let mut positions = Vec::with_capacity(positions_count as usize);
    let mut buf = [0u8; 4];
    for _ in 0..positions_count {
        r.read_exact(&mut buf)?;
        positions.push(u32::from_le_bytes(buf));
    }
    Ok(Some(PositionalRecord { doc_id, freq, positions }))
}

fn list_barrel_files(config: &BuildConfig) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = (0..config.num_barrels).map(|b| config.barrel_path(b)).collect();
    files.push(config.freq_barrel_path());
    Ok(files.into_iter().filter(|p| p.exists()).collect())
}

fn spill_path(tmp_dir: &Path, token_id: u32) -> PathBuf {
    tmp_dir.join(format!("token_{token_id}.bin"))
}

struct ScanState {
    in_memory: HashMap<u32, Vec<PositionalRecord>>,
    disk_count: HashMap<u32, u64>,
    seen_tokens: BTreeSet<u32>,
}

fn scan_barrels(config: &BuildConfig, tmp_dir: &Path) -> Result<ScanState> {
    let mut state = ScanState {
        in_memory: HashMap::new(),
        disk_count: HashMap::new(),
        seen_tokens: BTreeSet::new(),
    };

    let mut total_records: u64 = 0;
    for barrel_path in list_barrel_files(config)? {
        let file = File::open(&barrel_path)?;
        let mut reader = BufReader::new(file);

        loop {
            let mut hdr = [0u8; 4];
            match reader.read_exact(&mut hdr) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let token_id = u32::from_le_bytes(hdr);
            let record = match read_record(&mut reader)? {
                Some(r) => r,
                None => break,
            };

            state.seen_tokens.insert(token_id);
            let bucket = state.in_memory.entry(token_id).or_default();
            bucket.push(record);
            total_records += 1;

            if bucket.len() >= config.per_token_threshold {
                let path = spill_path(tmp_dir, token_id);
                let spill_file = OpenOptions::new().create(true).append(true).open(&path)?;
                let mut w = BufWriter::new(spill_file);
                for r in bucket.iter() {
                    write_record(&mut w, r)?;
                }
                w.flush()?;
                *state.disk_count.entry(token_id).or_insert(0) += bucket.len() as u64;
                bucket.clear();
            }
        }
    }

    tracing::info!(
        total_records,
        unique_tokens = state.seen_tokens.len(),
        "postings consolidator: scan complete"
    );

    Ok(state)
}

#[derive(Debug, Default, Clone)]
pub struct PostingsStats {
    pub unique_tokens: usize,
    pub total_postings: u64,
}

/// Run the scan and write phases, producing `postings_index.bin` and
/// `postings_offsets.bin`.
pub fn build_postings(config: &BuildConfig) -> Result<PostingsStats> {
    let tmp_dir = config.postings_tmp_dir();
    // A prior aborted build may have left spill files behind; clear them so
    // a restart doesn't append onto stale `token_<id>.bin` data and corrupt
    // the consolidated block.
    if tmp_dir.exists() {
        std::fs::remove_dir_all(&tmp_dir)?;
    }
    std::fs::create_dir_all(&tmp_dir)?;

    let state = scan_barrels(config, &tmp_dir)?;
    let stats = write_postings_index(config, state, &tmp_dir)?;

    let _ = std::fs::remove_dir(&tmp_dir);
    Ok(stats)
}

fn write_postings_index(config: &BuildConfig, mut state: ScanState, tmp_dir: &Path) -> Result<PostingsStats> {
    let index_tmp = config.postings_index_path().with_extension("bin.tmp");
    let offsets_tmp = config.postings_offsets_path().with_extension("bin.tmp");

    let mut offsets: Vec<(u32, u64, u64)> = Vec::new();
    let total_tokens = state.seen_tokens.len();
    let mut total_postings: u64 = 0;
    let mut written_tokens: u64 = 0;

    {
        let file = File::create(&index_tmp)?;
        let mut idx = BufWriter::new(file);
        let mut offset: u64 = 0;

        for token_id in state.seen_tokens.iter().copied() {
            let disk_count = state.disk_count.get(&token_id).copied().unwrap_or(0);
            let tail = state.in_memory.remove(&token_id).unwrap_or_default();
            let total_count = disk_count + tail.len() as u64;
            if total_count == 0 {
                continue;
            }

            let start_offset = offset;
            idx.write_all(&(total_count as u32).to_le_bytes())?;
            offset += 4;

            let spill = spill_path(tmp_dir, token_id);
            if disk_count > 0 && spill.exists() {
                let spill_file = File::open(&spill)?;
                let mut spill_reader = BufReader::new(spill_file);
                while let Some(record) = read_record(&mut spill_reader)? {
                    write_record(&mut idx, &record)?;
                    offset += 12 + 4 * record.positions.len() as u64;
                }
            }

            for record in &tail {
                write_record(&mut idx, record)?;
                offset += 12 + 4 * record.positions.len() as u64;
            }

            total_postings += total_count;
            offsets.push((token_id, start_offset, offset - start_offset));

            written_tokens += 1;
            if written_tokens % WRITE_LOG_EVERY == 0 {
                tracing::info!(written_tokens, total_tokens, "postings consolidator: write progress");
            }
        }

        idx.flush()?;
    }

    {
        let file = File::create(&offsets_tmp)?;
        let mut w = BufWriter::new(file);
        w.write_all(&(offsets.len() as u32).to_le_bytes())?;
        for (token_id, off, len) in &offsets {
            w.write_all(&token_id.to_le_bytes())?;
            w.write_all(&off.to_le_bytes())?;
            w.write_all(&len.to_le_bytes())?;
        }
        w.flush()?;
    }

    std::fs::rename(&index_tmp, config.postings_index_path())?;
    std::fs::rename(&offsets_tmp, config.postings_offsets_path())?;

    for token_id in state.seen_tokens {
        let path = spill_path(tmp_dir, token_id);
        let _ = std::fs::remove_file(path);
    }

    Ok(PostingsStats { unique_tokens: offsets.len(), total_postings })
}

/// Random-access reader over `postings_index.bin` + `postings_offsets.bin`.
pub struct PostingsStore {
    offsets: HashMap<u32, (u64, u64)>,
    index_path: PathBuf,
}

impl PostingsStore {
    pub fn open(config: &BuildConfig) -> Result<Self> {
        let mut file = File::open(config.postings_offsets_path())?;
        let mut buf4 = [0u8; 4];
        file.read_exact(&mut buf4)?;
        let entry_count = u32::from_le_bytes(buf4);

        let mut offsets = HashMap::with_capacity(entry_count as usize);
        let mut buf8 = [0u8; 8];
        for _ in 0..entry_count {
            file.read_exact(&mut buf4)?;
            let token_id = u32::from_le_bytes(buf4);
            file.read_exact(&mut buf8)?;
            let offset = u64::from_le_bytes(buf8);
            file.read_exact(&mut buf8)?;
            let length = u64::from_le_bytes(buf8);
            offsets.insert(token_id, (offset, length));
        }

        Ok(Self { offsets, index_path: config.postings_index_path() })
    }

    /// Read and parse the full positional block for `token_id`, or `None`
    /// if the token has no offsets entry.
    pub fn block_for(&self, token_id: u32) -> Result<Option<Vec<PositionalRecord>>> {
        let Some(&(offset, length)) = self.offsets.get(&token_id) else {
            return Ok(None);
        };

        use std::io::{Seek, SeekFrom};
        let mut file = File::open(&self.index_path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut block = vec![0u8; length as usize];
        file.read_exact(&mut block)?;

        let mut cursor = std::io::Cursor::new(block);
        let mut buf4 = [0u8; 4];
        cursor.read_exact(&mut buf4)?;
        let doc_count = u32::from_le_bytes(buf4);

        let mut records = Vec::with_capacity(doc_count as usize);
        for _ in 0..doc_count {
            if let Some(record) = read_record(&mut cursor)? {
                records.push(record);
            }
        }
        Ok(Some(records))
    }
}
