//! Lexicon: token ↔ token_id mapping, with binary (de)serialization.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{IndexError, Result};

/// Maintains `token → token_id` and the inverse ordered `token_id → token`
/// sequence. Ids are dense, contiguous, and assigned in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct Lexicon {
    word_to_id: HashMap<String, u32>,
    id_to_word: Vec<String>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct tokens in the lexicon.
    pub fn len(&self) -> usize {
        self.id_to_word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_word.is_empty()
    }

    /// Returns the id for `token`. When `create` is true and the token is
    /// unseen, appends it at id `len()`.
    pub fn get_id(&mut self, token: &str, create: bool) -> Option<u32> {
        if let Some(&id) = self.word_to_id.get(token) {
            return Some(id);
        }
        if !create {
            return None;
        }
        let id = self.id_to_word.len() as u32;
        self.id_to_word.push(token.to_string());
        self.word_to_id.insert(token.to_string(), id);
        Some(id)
    }

    pub fn token(&self, id: u32) -> Option<&str> {
        self.id_to_word.get(id as usize).map(|s| s.as_str())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.word_to_id.contains_key(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.id_to_word
            .iter()
            .enumerate()
            .map(|(id, tok)| (id as u32, tok.as_str()))
    }

    /// Write `lexicon.bin`: `u32 vocab_size` followed by, per token in id
    /// order, `u32 len | bytes | u32 token_id` (the trailing id is
    /// redundant but written for cross-implementation compatibility).
    pub fn write_binary(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("bin.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut w = BufWriter::new(file);
            w.write_all(&(self.id_to_word.len() as u32).to_le_bytes())?;
            for (id, token) in self.id_to_word.iter().enumerate() {
                let bytes = token.as_bytes();
                w.write_all(&(bytes.len() as u32).to_le_bytes())?;
                w.write_all(bytes)?;
                w.write_all(&(id as u32).to_le_bytes())?;
            }
            w.flush()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Read `lexicon.bin` back into a `Lexicon`. Verifies (does not
    /// require) that the trailing redundant id matches the record index.
    pub fn read_binary(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut r = BufReader::new(file);

        let mut u32_buf = [0u8; 4];
        r.read_exact(&mut u32_buf)?;
        let vocab_size = u32::from_le_bytes(u32_buf);

        let mut lex = Lexicon {
            word_to_id: HashMap::with_capacity(vocab_size as usize),
            id_to_word: Vec::with_capacity(vocab_size as usize),
        };

        for expected_id in 0..vocab_size {
            r.read_exact(&mut u32_buf).map_err(|_| IndexError::Truncated {
                file: path.to_path_buf(),
                detail: "missing token_len field".into(),
            })?;
            let token_len = u32::from_le_bytes(u32_buf) as usize;

            let mut bytes = vec![0u8; token_len];
            r.read_exact(&mut bytes).map_err(|_| IndexError::Truncated {
                file: path.to_path_buf(),
                detail: "truncated token bytes".into(),
            })?;
            let token = String::from_utf8(bytes).map_err(|e| IndexError::Truncated {
                file: path.to_path_buf(),
                detail: format!("invalid utf8 token: {e}"),
            })?;

            r.read_exact(&mut u32_buf).map_err(|_| IndexError::Truncated {
                file: path.to_path_buf(),
                detail: "missing token_id field".into(),
            })?;
            let stored_id = u32::from_le_bytes(u32_buf);
            if stored_id != expected_id {
                return Err(IndexError::CountMismatch {
                    file: path.to_path_buf(),
                    declared: expected_id as u64,
                    actual: stored_id as u64,
                });
            }

            lex.word_to_id.insert(token.clone(), expected_id);
            lex.id_to_word.push(token);
        }

        Ok(lex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn ids_assigned_in_first_seen_order() {
        let mut lex = Lexicon::new();
        assert_eq!(lex.get_id("virus", true), Some(0));
        assert_eq!(lex.get_id("cell", true), Some(1));
        assert_eq!(lex.get_id("virus", true), Some(0));
        assert_eq!(lex.len(), 2);
    }

    #[test]
    fn get_id_without_create_returns_none_for_unseen() {
        let mut lex = Lexicon::new();
        lex.get_id("virus", true);
        assert_eq!(lex.get_id("cell", false), None);
    }

    #[test]
    fn round_trip_is_identity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lexicon.bin");

        let mut lex = Lexicon::new();
        for tok in ["virus", "cell", "host", "ångström"] {
            lex.get_id(tok, true);
        }
        lex.write_binary(&path).unwrap();

        let loaded = Lexicon::read_binary(&path).unwrap();
        assert_eq!(loaded.len(), lex.len());
        for (id, tok) in lex.iter() {
            assert_eq!(loaded.token(id), Some(tok));
        }
    }

    #[test]
    fn truncated_file_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lexicon.bin");
        std::fs::write(&path, 5u32.to_le_bytes()).unwrap(); // declares 5, has 0
        let err = Lexicon::read_binary(&path).unwrap_err();
        assert!(matches!(err, IndexError::Truncated { .. }));
    }
}
