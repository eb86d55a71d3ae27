//! Vocabulary loading for the tiktoken text format.
//!
//! Each line of a vocabulary file is a base64-encoded token byte sequence,
//! a space, and an integer rank. Lower ranks merge first during byte-pair
//! encoding. The vocabularies embedded in this crate are compact exact BPE
//! tables: every single byte 0..=255 occupies ranks 0..=255, trained merges
//! follow from rank 256, and a handful of research-catalogued glitch entries
//! sit at their canonical ids.

use base64::{engine::general_purpose::STANDARD, Engine};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Errors that can occur while parsing a vocabulary table.
#[derive(Error, Debug)]
pub enum VocabError {
    #[error("invalid base64 token: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid vocabulary line: {0}")]
    Parse(String),
}

/// Parse a tiktoken-format vocabulary from raw bytes.
///
/// Returns the encoder map (token bytes → rank). Blank lines are ignored.
pub fn load_tiktoken_bpe(data: &[u8]) -> Result<FxHashMap<Vec<u8>, u32>, VocabError> {
    let mut encoder = FxHashMap::default();

    for line in data.split(|&b| b == b'\n') {
        let line = match line.last() {
            Some(b'\r') => &line[..line.len() - 1],
            _ => line,
        };
        if line.is_empty() {
            continue;
        }

        let space = line
            .iter()
            .rposition(|&b| b == b' ')
            .ok_or_else(|| VocabError::Parse("missing space separator".to_string()))?;

        let token = STANDARD.decode(&line[..space])?;
        let rank = std::str::from_utf8(&line[space + 1..])
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .ok_or_else(|| {
                VocabError::Parse(format!(
                    "invalid rank for token {:?}",
                    String::from_utf8_lossy(&token)
                ))
            })?;

        encoder.insert(token, rank);
    }

    Ok(encoder)
}

/// Build the decoder map (rank → token bytes) from an encoder map.
pub fn build_decoder(encoder: &FxHashMap<Vec<u8>, u32>) -> FxHashMap<u32, Vec<u8>> {
    encoder.iter().map(|(k, v)| (*v, k.clone())).collect()
}
