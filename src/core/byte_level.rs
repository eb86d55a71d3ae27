//! The GPT-2 byte ↔ character alphabet, used for display and classification.
//!
//! Tokens are arbitrary byte sequences, and a token that splits a multi-byte
//! character is not valid UTF-8 on its own. To keep every token displayable,
//! such tokens are rendered through the classic byte-level bijection: each
//! byte maps to one printable character. Printable ASCII and most of Latin-1
//! map to themselves; the 68 remaining bytes (controls, space, DEL, 0x7F-0xA0,
//! 0xAD) map to U+0100 onwards, which is where the familiar `Ġ` (space) and
//! `Ċ` (newline) markers come from.
//!
//! The classifier uses [`is_byte_marker_char`] to recognize this alphabet's
//! escape range in token text.

use rustc_hash::FxHashMap;
use std::sync::LazyLock;

/// First remapped codepoint; bytes without a printable identity land here.
const ESCAPE_BASE: u32 = 0x100;

/// Byte value → display character, 256 entries.
static BYTE_TO_CHAR: LazyLock<[char; 256]> = LazyLock::new(|| {
    let mut mapping = ['\0'; 256];

    let is_direct = |b: u8| matches!(b, 33..=126 | 161..=172 | 174..=255);
    for b in 0u8..=255 {
        if is_direct(b) {
            mapping[b as usize] = b as char;
        }
    }

    let mut next = ESCAPE_BASE;
    for b in 0u8..=255 {
        if !is_direct(b) {
            // next stays below 0x144, always a valid char
            mapping[b as usize] = char::from_u32(next).unwrap();
            next += 1;
        }
    }

    mapping
});

/// Display character → byte value, the inverse of [`BYTE_TO_CHAR`].
static CHAR_TO_BYTE: LazyLock<FxHashMap<char, u8>> = LazyLock::new(|| {
    BYTE_TO_CHAR
        .iter()
        .enumerate()
        .map(|(byte, &ch)| (ch, byte as u8))
        .collect()
});

/// Render raw bytes as their byte-level display string.
#[inline]
pub fn byte_level_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| BYTE_TO_CHAR[b as usize]).collect()
}

/// Recover raw bytes from a byte-level display string.
///
/// Returns `None` if the string contains characters outside the alphabet.
#[inline]
pub fn byte_level_decode(text: &str) -> Option<Vec<u8>> {
    text.chars()
        .map(|ch| CHAR_TO_BYTE.get(&ch).copied())
        .collect()
}

/// Whether `ch` is one of the 68 escape characters the alphabet remaps
/// non-printable bytes to (U+0100..=U+0143).
#[inline]
pub fn is_byte_marker_char(ch: char) -> bool {
    (ESCAPE_BASE..ESCAPE_BASE + 68).contains(&(ch as u32))
}
