#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
#![deny(missing_docs, unused_must_use)]

//! Character-level vocabulary loaded from a JSON tokenizer description.
//!
//! The on-disk resource holds two maps: `stoi` (character -> token id) and
//! `itos` (token id, as a decimal string key -> character). Once loaded the
//! vocabulary is immutable; `encode` and `decode` are pure lookups over it.
//! Every call to [`Vocabulary::load`] re-reads the file, nothing is cached.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

/// Errors produced while loading or using a vocabulary.
#[derive(Debug, thiserror::Error)]
pub enum VocabError {
    /// The tokenizer resource could not be read.
    #[error("failed to fetch vocabulary: {0}")]
    Fetch(#[from] std::io::Error),
    /// The resource body is not well-formed JSON of the expected shape.
    #[error("failed to parse vocabulary: {0}")]
    Parse(#[from] serde_json::Error),
    /// An `itos` key is not a decimal token id.
    #[error("bad token index in vocabulary: {0:?}")]
    BadIndex(String),
    /// `encode` met a character absent from the `stoi` map.
    #[error("character {0:?} is not in the vocabulary")]
    UnknownChar(char),
    /// `decode` met a token id absent from the `itos` map.
    #[error("token id {0} is not in the vocabulary")]
    UnknownId(i32),
}

/// On-disk shape of the tokenizer description.
#[derive(Deserialize)]
struct RawVocab {
    stoi: HashMap<char, i32>,
    itos: HashMap<String, String>,
}

/// Character-to-id map and its inverse, immutable once loaded.
#[derive(Debug)]
pub struct Vocabulary {
    stoi: HashMap<char, i32>,
    itos: HashMap<i32, String>,
}

impl Vocabulary {
    /// Load a vocabulary from a JSON file holding `stoi` and `itos` maps.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, VocabError> {
        let body = std::fs::read_to_string(path)?;
        Self::from_json(&body)
    }

    /// Parse a vocabulary from a JSON string.
    pub fn from_json(body: &str) -> Result<Self, VocabError> {
        let raw: RawVocab = serde_json::from_str(body)?;
        let mut itos = HashMap::with_capacity(raw.itos.len());
        for (key, glyph) in raw.itos {
            let id = key.parse::<i32>().map_err(|_| VocabError::BadIndex(key))?;
            itos.insert(id, glyph);
        }
        tracing::info!(entries = raw.stoi.len(), "vocabulary loaded");
        Ok(Self { stoi: raw.stoi, itos })
    }

    /// Map each character of `text` to its token id, in input order.
    ///
    /// Characters outside the vocabulary are rejected rather than mapped to
    /// a sentinel id.
    pub fn encode(&self, text: &str) -> Result<Vec<i32>, VocabError> {
        text.chars()
            .map(|c| self.stoi.get(&c).copied().ok_or(VocabError::UnknownChar(c)))
            .collect()
    }

    /// Map each id back to its character form and concatenate. An empty
    /// input yields the empty string.
    pub fn decode(&self, ids: &[i32]) -> Result<String, VocabError> {
        let mut out = String::with_capacity(ids.len());
        for &id in ids {
            out.push_str(self.glyph_for(id)?);
        }
        Ok(out)
    }

    /// Character form of a single token id.
    pub fn glyph_for(&self, id: i32) -> Result<&str, VocabError> {
        self.itos
            .get(&id)
            .map(String::as_str)
            .ok_or(VocabError::UnknownId(id))
    }

    /// Number of entries in the character-to-id map.
    pub fn len(&self) -> usize {
        self.stoi.len()
    }

    /// True when the vocabulary holds no entries.
    pub fn is_empty(&self) -> bool {
        self.stoi.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn toy() -> Vocabulary {
        Vocabulary::from_json(r#"{"stoi":{"a":0,"b":1},"itos":{"0":"a","1":"b"}}"#).unwrap()
    }

    #[test]
    fn encode_maps_in_input_order() {
        assert_eq!(toy().encode("ab").unwrap(), vec![0, 1]);
    }

    #[test]
    fn decode_concatenates_in_order() {
        assert_eq!(toy().decode(&[1, 0]).unwrap(), "ba");
    }

    #[test]
    fn round_trip_preserves_in_vocab_text() {
        let v = toy();
        let ids = v.encode("abba").unwrap();
        assert_eq!(v.decode(&ids).unwrap(), "abba");
    }

    #[test]
    fn empty_string_round_trips_to_empty() {
        let v = toy();
        assert_eq!(v.encode("").unwrap(), Vec::<i32>::new());
        assert_eq!(v.decode(&[]).unwrap(), "");
    }

    #[test]
    fn unknown_character_is_rejected() {
        assert!(matches!(toy().encode("ax"), Err(VocabError::UnknownChar('x'))));
    }

    #[test]
    fn unknown_id_is_rejected() {
        assert!(matches!(toy().decode(&[7]), Err(VocabError::UnknownId(7))));
    }

    #[test]
    fn missing_file_is_a_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Vocabulary::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, VocabError::Fetch(_)));
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{{not json").unwrap();
        assert!(matches!(Vocabulary::load(f.path()), Err(VocabError::Parse(_))));
    }

    #[test]
    fn non_decimal_index_is_rejected() {
        let err = Vocabulary::from_json(r#"{"stoi":{"a":0},"itos":{"zero":"a"}}"#).unwrap_err();
        assert!(matches!(err, VocabError::BadIndex(_)));
    }
}
