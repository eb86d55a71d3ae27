//! Per-token inspection data: code points, hex, and binary views.

use crate::types::{Token, TokenMetadata};

/// Derive inspection data for a single token.
///
/// Total over any well-formed token; a token with empty `bytes` yields empty
/// hex and binary strings rather than an error.
pub fn extract_metadata(token: &Token) -> TokenMetadata {
    let unicode_points = token
        .text
        .chars()
        .map(|c| format!("U+{:04X}", c as u32))
        .collect();

    let hex_bytes = token
        .bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ");

    let binary_rep = token
        .bytes
        .iter()
        .map(|b| format!("{b:08b}"))
        .collect::<Vec<_>>()
        .join(" ");

    TokenMetadata {
        token: token.clone(),
        unicode_points,
        hex_bytes,
        binary_rep,
        vocab_rank: token.id,
    }
}
