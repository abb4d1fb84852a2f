//! Forward-index construction: streaming tokenization, lexicon
//! assignment, and binary serialization under bounded memory.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::{BuildConfig, LOG_EVERY, PDF_SUBDIR, STRUCTURED_SUBDIR};
use crate::error::{IndexError, Result};
use crate::indexer::lexicon::Lexicon;
use crate::indexer::tokenizer::{default_stopwords, tokenize};

/// One record in the forward index: a document and the token ids that
/// occur in it, in occurrence order (the list index is the position).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRecord {
    pub doc_id: u32,
    pub token_ids: Vec<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSection {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    paper_id: Option<String>,
    #[serde(default)]
    metadata: RawMetadata,
    #[serde(default)]
    r#abstract: Vec<RawSection>,
    #[serde(default)]
    body_text: Vec<RawSection>,
}

/// A parsed source document ready for tokenization.
pub struct Document {
    pub paper_id: String,
    pub title: String,
    abstract_sections: Vec<RawSection>,
    body_sections: Vec<RawSection>,
}

impl Document {
    /// Concatenation of non-empty abstract-section texts followed by
    /// non-empty body-section texts, each group joined with `"\n"`.
    pub fn text(&self) -> String {
        let abstract_text = join_sections(&self.abstract_sections);
        let body_text = join_sections(&self.body_sections);
        format!("{abstract_text}\n{body_text}").trim().to_string()
    }
}

fn join_sections(sections: &[RawSection]) -> String {
    sections
        .iter()
        .map(|s| s.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a single document JSON file.
pub fn process_document(path: &Path) -> Result<Document> {
    let bytes = std::fs::read(path)?;
    let raw: RawDocument = serde_json::from_slice(&bytes).map_err(|source| IndexError::DocumentParse {
        path: path.to_path_buf(),
        source,
    })?;

    let paper_id = raw.paper_id.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    Ok(Document {
        paper_id,
        title: raw.metadata.title,
        abstract_sections: raw.r#abstract,
        body_sections: raw.body_text,
    })
}

/// Enumerate source files: the structured (`pmc_json`) subdirectory in
/// sorted-filename order, then the PDF-extracted (`pdf_json`) subdirectory
/// in sorted-filename order, skipping any `paper_id` already seen in the
/// structured source.
pub fn iter_source_files(input_dir: &Path) -> Result<Vec<PathBuf>> {
    if !input_dir.exists() {
        return Err(IndexError::InputDirNotFound(input_dir.to_path_buf()));
    }

    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for subdir in [STRUCTURED_SUBDIR, PDF_SUBDIR] {
        let dir = input_dir.join(subdir);
        if !dir.is_dir() {
            continue;
        }
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "json"))
            .collect();
        entries.sort();

        for path in entries {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let paper_key = stem.split('.').next().unwrap_or(&stem).to_string();
            if seen.contains(&paper_key) {
                continue;
            }
            seen.insert(paper_key);
            files.push(path);
        }
    }

    Ok(files)
}

/// Statistics returned by `build_forward_index`.
#[derive(Debug, Default, Clone)]
pub struct ForwardIndexStats {
    pub documents_indexed: usize,
    pub docs_skipped: usize,
    pub unique_terms: usize,
    pub total_tokens: u64,
    pub avg_doc_length: f64,
}

/// Build the forward index, lexicon, and doc_ids mapping for `config`.
///
/// Streams the corpus enumeration, tokenizing each accepted document and
/// assigning a dense `doc_id`. Documents yielding zero tokens are skipped
/// and do not advance the `doc_id` counter.
pub fn build_forward_index(config: &BuildConfig) -> Result<ForwardIndexStats> {
    let files = iter_source_files(&config.input_dir)?;
    let stopwords = default_stopwords();
    let mut lexicon = Lexicon::new();

    let mut records: Vec<ForwardRecord> = Vec::new();
    let mut doc_metadata: Vec<(u32, String)> = Vec::new();

    let mut doc_count: u32 = 0;
    let mut docs_skipped: usize = 0;
    let mut total_tokens: u64 = 0;

    tracing::info!(input_dir = %config.input_dir.display(), "starting forward index build");

    for path in &files {
        let doc = match process_document(path) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping unparseable document");
                docs_skipped += 1;
                continue;
            }
        };

        let tokens = tokenize(&doc.text(), &stopwords);
        if tokens.is_empty() {
            docs_skipped += 1;
            continue;
        }

        let doc_id = doc_count;
        let token_ids: Vec<u32> = tokens
            .iter()
            .map(|t| lexicon.get_id(t, true).expect("create=true never returns None"))
            .collect();
        total_tokens += token_ids.len() as u64;
        records.push(ForwardRecord { doc_id, token_ids });
        doc_metadata.push((doc_id, doc.paper_id));
        doc_count += 1;

        if doc_count as u64 % LOG_EVERY == 0 {
            let avg = total_tokens / doc_count as u64;
            tracing::info!(doc_count, vocab = lexicon.len(), avg_tokens = avg, "forward index progress");
        }

        if let Some(limit) = config.limit {
            if doc_count as usize >= limit {
                break;
            }
        }
    }

    if records.is_empty() {
        return Err(IndexError::EmptyCorpus(config.input_dir.clone()));
    }

    std::fs::create_dir_all(&config.output_dir)?;
    write_forward_index(&records, &config.forward_index_path())?;
    lexicon.write_binary(&config.lexicon_path())?;
    write_doc_ids(&doc_metadata, &config.doc_ids_path())?;

    let avg_doc_length = total_tokens as f64 / doc_count as f64;
    let stats = ForwardIndexStats {
        documents_indexed: doc_count as usize,
        docs_skipped,
        unique_terms: lexicon.len(),
        total_tokens,
        avg_doc_length,
    };

    tracing::info!(
        documents_indexed = stats.documents_indexed,
        docs_skipped = stats.docs_skipped,
        unique_terms = stats.unique_terms,
        total_tokens = stats.total_tokens,
        avg_doc_length = stats.avg_doc_length,
        "forward index build complete"
    );

    Ok(stats)
}

/// Write `forward_index.bin`, atomically via
/// write-to-temp-then-rename.
pub fn write_forward_index(records: &[ForwardRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("bin.tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut w = BufWriter::new(file);
        w.write_all(&(records.len() as u32).to_le_bytes())?;
        for record in records {
            w.write_all(&record.doc_id.to_le_bytes())?;
            w.write_all(&(record.token_ids.len() as u32).to_le_bytes())?;
            for &tid in &record.token_ids {
                w.write_all(&tid.to_le_bytes())?;
            }
        }
        w.flush()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn write_doc_ids(metadata: &[(u32, String)], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);
    for (doc_id, paper_id) in metadata {
        writeln!(w, "{doc_id}\t{paper_id}")?;
    }
    w.flush()?;
    Ok(())
}

/// Streaming reader over `forward_index.bin`, yielding one
/// `(doc_id, token_ids)` record at a time without loading the whole file.
pub struct ForwardIndexReader {
    reader: BufReader<File>,
    doc_count: u32,
    docs_read: u32,
    path: PathBuf,
}

impl ForwardIndexReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut u32_buf = [0u8; 4];
        reader.read_exact(&mut u32_buf).map_err(|_| IndexError::Truncated {
            file: path.to_path_buf(),
            detail: "missing doc_count header".into(),
        })?;
        let doc_count = u32::from_le_bytes(u32_buf);
        Ok(Self {
            reader,
            doc_count,
            docs_read: 0,
            path: path.to_path_buf(),
        })
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    /// Reads the next record, or `None` once `doc_count` records have been
    /// read. Returns `Err` on truncation or a short read.
    pub fn next_record(&mut self) -> Result<Option<ForwardRecord>> {
        if self.docs_read >= self.doc_count {
            return Ok(None);
        }

        let mut hdr = [0u8; 8];
        self.reader.read_exact(&mut hdr).map_err(|_| IndexError::Truncated {
            file: self.path.clone(),
            detail: format!("truncated record header at index {}", self.docs_read),
        })?;
        let doc_id = u32::from_le_bytes(hdr[0..4].try_into().unwrap());
        let token_count = u32::from_le_bytes(hdr[4..8].try_into().unwrap());

        let mut token_ids = Vec::with_capacity(token_count as usize);
        let mut tok_buf = [0u8; 4];
        for _ in 0..token_count {
            self.reader.read_exact(&mut tok_buf).map_err(|_| IndexError::Truncated {
                file: self.path.clone(),
                detail: format!("truncated token list for doc_id {doc_id}"),
            })?;
            token_ids.push(u32::from_le_bytes(tok_buf));
        }

        self.docs_read += 1;
        Ok(Some(ForwardRecord { doc_id, token_ids }))
    }

    /// Consumes the reader, verifying the declared `doc_count` matches the
    /// number of records actually read.
    pub fn finish(self) -> Result<()> {
        if self.docs_read != self.doc_count {
            return Err(IndexError::CountMismatch {
                file: self.path,
                declared: self.doc_count as u64,
                actual: self.docs_read as u64,
            });
        }
        Ok(())
    }
}
