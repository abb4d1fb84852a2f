//! Bucketed external-merge inverter.
//!
//! Converts the forward index into a sorted, deduplicated doc-only
//! inverted index via a three-pass disk-sharded merge sort: shard
//! `(token_id, doc_id)` pairs by `token_id mod B`, compact each bucket in
//! RAM, then k-way-merge the (disjoint, already-sorted) compact buckets.

use std::collections::{BTreeMap, BinaryHeap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::BuildConfig;
use crate::error::{IndexError, Result};
use crate::indexer::forward::ForwardIndexReader;

const BUCKET_RECORD_WIDTH: u64 = 8; // (token_id: u32, doc_id: u32)

#[derive(Debug, Default, Clone)]
pub struct InvertStats {
    pub vocab_size: u32,
    pub total_postings: u64,
}

/// Run all three passes, writing `inverted_index.bin` under `config`.
pub fn build_inverted_index(config: &BuildConfig) -> Result<InvertStats> {
    let tmp_dir = config.bucket_tmp_dir();
    std::fs::create_dir_all(&tmp_dir)?;

    let (bucket_paths, bucket_nonempty) =
        shard_forward_index(&config.forward_index_path(), &tmp_dir, config.bucket_count)?;
    let compact_paths = compact_buckets(&bucket_paths, &bucket_nonempty, &tmp_dir)?;
    let stats = merge_compact_buckets(&compact_paths, &config.inverted_index_path())?;

    // Every bucket file was created in Pass 1 regardless of whether it ended
    // up non-empty, so all of them (not just the `Some` compact paths) must
    // be swept here; otherwise empty buckets leak and `tmp_dir` is never
    // empty enough to remove.
    for path in &bucket_paths {
        let _ = std::fs::remove_file(path);
    }
    for path in compact_paths.iter().flatten() {
        let _ = std::fs::remove_file(path);
    }
    let _ = std::fs::remove_dir(&tmp_dir);

    Ok(stats)
}

/// Pass 1 — shard `(token_id, doc_id)` pairs into `bucket_count` files
/// keyed by `token_id mod bucket_count`. Returns every bucket's path
/// (all are created up front) alongside a per-bucket "has any records"
/// flag so later passes can skip empty ones without losing track of the
/// file for cleanup.
fn shard_forward_index(
    forward_path: &Path,
    tmp_dir: &Path,
    bucket_count: u32,
) -> Result<(Vec<PathBuf>, Vec<bool>)> {
    let bucket_paths: Vec<PathBuf> = (0..bucket_count)
        .map(|b| tmp_dir.join(format!("bucket_{b:04}.bin")))
        .collect();
    let mut writers: Vec<BufWriter<File>> = bucket_paths
        .iter()
        .map(|p| File::create(p).map(BufWriter::new))
        .collect::<std::io::Result<_>>()?;
    let mut bucket_nonempty = vec![false; bucket_count as usize];

    let mut reader = ForwardIndexReader::open(forward_path)?;
    let declared_doc_count = reader.doc_count();
    let mut docs_read: u64 = 0;

    while let Some(record) = reader.next_record()? {
        for &token_id in &record.token_ids {
            let bucket = (token_id % bucket_count) as usize;
            writers[bucket].write_all(&token_id.to_le_bytes())?;
            writers[bucket].write_all(&record.doc_id.to_le_bytes())?;
            bucket_nonempty[bucket] = true;
        }
        docs_read += 1;
    }
    reader.finish()?;

    for w in &mut writers {
        w.flush()?;
    }

    if docs_read != declared_doc_count as u64 {
        return Err(IndexError::CountMismatch {
            file: forward_path.to_path_buf(),
            declared: declared_doc_count as u64,
            actual: docs_read,
        });
    }

    Ok((bucket_paths, bucket_nonempty))
}

/// Pass 2 — for each non-empty bucket, load `(token_id, doc_id)` pairs,
/// dedup per token, sort doc_ids ascending, and write a "compact bucket"
/// stream of `(token_id, doc_freq, sorted_doc_ids)` records in ascending
/// `token_id` order.
fn compact_buckets(bucket_paths: &[PathBuf], bucket_nonempty: &[bool], tmp_dir: &Path) -> Result<Vec<Option<PathBuf>>> {
    let mut compact_paths = Vec::with_capacity(bucket_paths.len());

    for (idx, bucket_path) in bucket_paths.iter().enumerate() {
        if !bucket_nonempty[idx] {
            compact_paths.push(None);
            continue;
        }

        let size = std::fs::metadata(bucket_path)?.len();
        if size % BUCKET_RECORD_WIDTH != 0 {
            return Err(IndexError::MisalignedBucket {
                file: bucket_path.clone(),
                size,
                record_width: BUCKET_RECORD_WIDTH,
            });
        }

        let mut map: BTreeMap<u32, std::collections::BTreeSet<u32>> = BTreeMap::new();
        let file = File::open(bucket_path)?;
        let mut reader = BufReader::new(file);
        let mut buf = [0u8; 8];
        loop {
            match reader.read_exact(&mut buf) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let token_id = u32::from_le_bytes(buf[0..4].try_into().unwrap());
            let doc_id = u32::from_le_bytes(buf[4..8].try_into().unwrap());
            map.entry(token_id).or_default().insert(doc_id);
        }

        let compact_path = tmp_dir.join(format!("compact_{idx:04}.bin"));
        let out = File::create(&compact_path)?;
        let mut w = BufWriter::new(out);
        for (token_id, doc_ids) in &map {
            w.write_all(&token_id.to_le_bytes())?;
            w.write_all(&(doc_ids.len() as u32).to_le_bytes())?;
            for doc_id in doc_ids {
                w.write_all(&doc_id.to_le_bytes())?;
            }
        }
        w.flush()?;
        compact_paths.push(Some(compact_path));
    }

    Ok(compact_paths)
}

struct CompactBucketStream {
    reader: BufReader<File>,
    path: PathBuf,
}

impl CompactBucketStream {
    fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
            path: path.to_path_buf(),
        })
    }

    fn next_record(&mut self) -> Result<Option<(u32, Vec<u32>)>> {
        let mut hdr = [0u8; 8];
        match self.reader.read_exact(&mut hdr) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let token_id = u32::from_le_bytes(hdr[0..4].try_into().unwrap());
        let doc_freq = u32::from_le_bytes(hdr[4..8].try_into().unwrap());

        let mut doc_ids = Vec::with_capacity(doc_freq as usize);
        let mut buf = [0u8; 4];
        for _ in 0..doc_freq {
            self.reader.read_exact(&mut buf).map_err(|_| IndexError::Truncated {
                file: self.path.clone(),
                detail: format!("truncated doc_id list for token {token_id}"),
            })?;
            doc_ids.push(u32::from_le_bytes(buf));
        }
        Ok(Some((token_id, doc_ids)))
    }
}

struct HeapEntry {
    token_id: u32,
    stream_index: usize,
    doc_ids: Vec<u32>,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.token_id == other.token_id
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse for a min-heap keyed by token_id.
        other.token_id.cmp(&self.token_id)
    }
}

/// Pass 3 — k-way merge the disjoint, per-bucket sorted compact streams
/// into the final `inverted_index.bin`. Since sharding is a modulo
/// partition, each `token_id` appears in exactly one stream; the heap
/// only interleaves disjoint tokens, never merges same-key records.
fn merge_compact_buckets(compact_paths: &[Option<PathBuf>], output_path: &Path) -> Result<InvertStats> {
    let mut streams: Vec<CompactBucketStream> = Vec::new();
    let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();

    for maybe_path in compact_paths.iter().flatten() {
        let mut stream = CompactBucketStream::open(maybe_path)?;
        if let Some((token_id, doc_ids)) = stream.next_record()? {
            let stream_index = streams.len();
            streams.push(stream);
            heap.push(HeapEntry { token_id, stream_index, doc_ids });
        }
    }

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = output_path.with_extension("bin.tmp");
    let mut token_count: u32 = 0;
    let mut total_postings: u64 = 0;
    {
        let file = File::create(&tmp_path)?;
        let mut w = BufWriter::new(file);
        w.write_all(&0u32.to_le_bytes())?; // placeholder, patched below

        while let Some(entry) = heap.pop() {
            w.write_all(&entry.token_id.to_le_bytes())?;
            w.write_all(&(entry.doc_ids.len() as u32).to_le_bytes())?;
            for doc_id in &entry.doc_ids {
                w.write_all(&doc_id.to_le_bytes())?;
            }
            total_postings += entry.doc_ids.len() as u64;
            token_count += 1;

            if let Some((next_token, next_docs)) = streams[entry.stream_index].next_record()? {
                heap.push(HeapEntry {
                    token_id: next_token,
                    stream_index: entry.stream_index,
                    doc_ids: next_docs,
                });
            }
        }

        w.flush()?;
        let mut file = w.into_inner().map_err(|e| e.into_error())?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&token_count.to_le_bytes())?;
        file.flush()?;
    }

    std::fs::rename(&tmp_path, output_path)?;

    Ok(InvertStats { vocab_size: token_count, total_postings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::forward::{write_forward_index, ForwardRecord};
    use tempfile::tempdir;

    fn read_inverted(path: &Path) -> Vec<(u32, Vec<u32>)> {
        let mut file = File::open(path).unwrap();
        let mut buf4 = [0u8; 4];
        file.read_exact(&mut buf4).unwrap();
        let vocab_size = u32::from_le_bytes(buf4);
        let mut out = Vec::new();
        for _ in 0..vocab_size {
            file.read_exact(&mut buf4).unwrap();
            let token_id = u32::from_le_bytes(buf4);
            file.read_exact(&mut buf4).unwrap();
            let doc_freq = u32::from_le_bytes(buf4);
            let mut docs = Vec::with_capacity(doc_freq as usize);
            for _ in 0..doc_freq {
                file.read_exact(&mut buf4).unwrap();
                docs.push(u32::from_le_bytes(buf4));
            }
            out.push((token_id, docs));
        }
        out
    }

    #[test]
    fn three_document_scenario_matches_expected_postings() {
        // virus=0, cell=1, host=2.
        let dir = tempdir().unwrap();
        let records = vec![
            ForwardRecord { doc_id: 0, token_ids: vec![0, 0, 1] }, // virus virus cell
            ForwardRecord { doc_id: 1, token_ids: vec![1, 2] },    // cell host
            ForwardRecord { doc_id: 2, token_ids: vec![0, 2, 2] }, // virus host host
        ];
        write_forward_index(&records, &dir.path().join("forward_index.bin")).unwrap();

        let mut config = BuildConfig::new(dir.path(), dir.path());
        config.bucket_count = 4;
        let stats = build_inverted_index(&config).unwrap();
        assert_eq!(stats.vocab_size, 3);

        let mut postings = read_inverted(&config.inverted_index_path());
        postings.sort_by_key(|(tid, _)| *tid);
        assert_eq!(postings, vec![(0, vec![0, 2]), (1, vec![0, 1]), (2, vec![1, 2])]);
    }

    #[test]
    fn doc_ids_are_sorted_and_deduplicated() {
        let dir = tempdir().unwrap();
        // token 0 appears twice in doc 0 (duplicate within a document).
        let records = vec![
            ForwardRecord { doc_id: 0, token_ids: vec![0, 0] },
            ForwardRecord { doc_id: 1, token_ids: vec![0] },
        ];
        write_forward_index(&records, &dir.path().join("forward_index.bin")).unwrap();

        let config = BuildConfig::new(dir.path(), dir.path());
        build_inverted_index(&config).unwrap();
        let postings = read_inverted(&config.inverted_index_path());
        assert_eq!(postings, vec![(0, vec![0, 1])]);
    }

    #[test]
    fn single_document_corpus_single_entry() {
        let dir = tempdir().unwrap();
        let records = vec![ForwardRecord { doc_id: 0, token_ids: vec![0, 1] }];
        write_forward_index(&records, &dir.path().join("forward_index.bin")).unwrap();

        let config = BuildConfig::new(dir.path(), dir.path());
        let stats = build_inverted_index(&config).unwrap();
        assert_eq!(stats.vocab_size, 2);
        let postings = read_inverted(&config.inverted_index_path());
        for (_, docs) in &postings {
            assert_eq!(docs, &vec![0]);
        }
    }

    #[test]
    fn truncated_declared_doc_count_aborts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forward_index.bin");
        let file = File::create(&path).unwrap();
        let mut w = BufWriter::new(file);
        w.write_all(&5u32.to_le_bytes()).unwrap(); // declares 5 docs
        w.write_all(&0u32.to_le_bytes()).unwrap();
        w.write_all(&0u32.to_le_bytes()).unwrap();
        w.flush().unwrap();
        drop(w);

        let config = BuildConfig::new(dir.path(), dir.path());
        let err = build_inverted_index(&config).unwrap_err();
        assert!(matches!(err, IndexError::Truncated { .. } | IndexError::CountMismatch { .. }));
    }
}
