//! The token classifier: a pure, total function from `(id, text)` to one
//! [`TokenType`].

use fancy_regex::Regex;
use std::sync::LazyLock;

use crate::core::is_byte_marker_char;
use crate::types::TokenType;

use super::catalog::is_glitch_id;

/// Ids at or above this value are reserved control tokens in every supported
/// vocabulary (cl100k reserves from 100257, Llama 3 from 128000).
pub const SPECIAL_ID_FLOOR: u32 = 100_000;

/// Capitalized fragment, hyphen, lowercase fragment: the shape left behind
/// when a word is split to dodge a filter ("Del-ete").
static FRAGMENT_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z][a-z]*-[a-z]+").expect("fragment-shape pattern is valid")
});

/// UTF-8 lead bytes render as these characters in decoded token text, the
/// other tell-tale of raw-byte fallback besides the escape alphabet.
const LEAD_BYTE_ARTIFACTS: [char; 2] = ['Ä', 'Ã'];

/// Label one token.
///
/// The precedence is fixed: special, glitch, number, whitespace, byte
/// fallback, suspicious, normal. A token matching several rules always gets
/// the earliest label, so a glitch id stays `Glitch` even if its text also
/// looks fragmented.
pub fn classify(id: u32, text: &str) -> TokenType {
    if id >= SPECIAL_ID_FLOOR {
        return TokenType::Special;
    }

    if is_glitch_id(id) {
        return TokenType::Glitch;
    }

    let trimmed = text.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return TokenType::Number;
    }

    if !text.is_empty() && text.chars().all(char::is_whitespace) {
        return TokenType::Whitespace;
    }

    if text
        .chars()
        .any(|c| is_byte_marker_char(c) || LEAD_BYTE_ARTIFACTS.contains(&c))
    {
        return TokenType::ByteFallback;
    }

    if matches!(FRAGMENT_SHAPE.find(text), Ok(Some(_))) {
        return TokenType::Suspicious;
    }

    TokenType::Normal
}
