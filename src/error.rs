//! Unified error type for the indexing pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can occur while building the index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// I/O error (file read/write, directory access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required input directory does not exist
    #[error("input directory does not exist: {0}")]
    InputDirNotFound(PathBuf),

    /// JSON parse error for a single source document (recovered, not fatal)
    #[error("failed to parse document {path}: {source}")]
    DocumentParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No document yielded any tokens; the build has nothing to index
    #[error("no documents were indexed under {0}; forward index would be empty")]
    EmptyCorpus(PathBuf),

    /// A binary record was shorter than its declared length
    #[error("truncated record in {file}: {detail}")]
    Truncated { file: PathBuf, detail: String },

    /// A declared count did not match the actual number of records read
    #[error("count mismatch in {file}: declared {declared}, found {actual}")]
    CountMismatch {
        file: PathBuf,
        declared: u64,
        actual: u64,
    },

    /// A bucket file's size was not a multiple of its record width
    #[error("bucket file {file} has size {size} which is not a multiple of {record_width}")]
    MisalignedBucket {
        file: PathBuf,
        size: u64,
        record_width: u64,
    },

    /// Invalid CLI argument combination or value
    #[error("{0}")]
    InvalidArgs(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = IndexError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn input_dir_not_found_display() {
        let err = IndexError::InputDirNotFound(PathBuf::from("/nonexistent"));
        assert!(err.to_string().contains("/nonexistent"));
    }

    #[test]
    fn empty_corpus_display() {
        let err = IndexError::EmptyCorpus(PathBuf::from("/data"));
        assert!(err.to_string().contains("no documents"));
    }

    #[test]
    fn count_mismatch_display() {
        let err = IndexError::CountMismatch {
            file: PathBuf::from("forward_index.bin"),
            declared: 10,
            actual: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains('7'));
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: IndexError = io_err.into();
        assert!(matches!(err, IndexError::Io(_)));
    }
}
