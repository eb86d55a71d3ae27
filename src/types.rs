//! Result data model shared by the tokenization core and the analysis layer.
//!
//! Everything here is created fresh per analysis call and immutable once
//! produced. All types serialize with camelCase field names so a presentation
//! layer can consume them directly.

use serde::{Deserialize, Serialize};

use crate::core::ModelId;

/// Security-relevant token taxonomy. Exactly one label per token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenType {
    /// Ordinary vocabulary entry.
    Normal,
    /// Reserved control token (`<|endoftext|>`, `<|begin_of_text|>`, ...).
    Special,
    /// Numeric content.
    Number,
    /// Whitespace-only content.
    Whitespace,
    /// Raw-byte escape rendered through the byte-level alphabet.
    ByteFallback,
    /// Catalogued anomalous vocabulary entry.
    Glitch,
    /// Fragmentation shape associated with filter evasion.
    Suspicious,
}

/// One positioned token from an encode call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: u32,
    /// Decoded text, or the byte-level rendering when the raw bytes are not
    /// valid UTF-8 on their own.
    pub text: String,
    /// Raw vocabulary bytes. Concatenated across a whole encode result these
    /// reproduce the input's UTF-8 bytes exactly.
    pub bytes: Vec<u8>,
    /// Index in the sequence, `0..N-1` with no gaps.
    pub position: usize,
    #[serde(rename = "type")]
    pub kind: TokenType,
}

/// Full result of encoding one input under one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizerResult {
    pub tokens: Vec<Token>,
    pub total_tokens: usize,
    /// Characters per token: `chars(input) / max(1, total_tokens)`.
    pub compression_ratio: f64,
    /// Human-readable vocabulary description. Approximated vocabularies say so.
    pub vocabulary_label: String,
}

/// One recorded step of the simulated byte-pair learning process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStep {
    /// 1-based, contiguous.
    pub step: usize,
    pub pair: (String, String),
    /// Adjacent-pair occurrence count at the time of the merge.
    pub frequency: u32,
    /// Always the concatenation of `pair`.
    pub new_token: String,
    pub token_id: u32,
}

/// Family of adversarial tokenization pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttackCategory {
    Smuggling,
    Splitting,
    Glitch,
    Obfuscation,
}

/// Static catalog entry describing one known exploit family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackPattern {
    pub name: &'static str,
    pub description: &'static str,
    pub category: AttackCategory,
    pub example_input: &'static str,
    pub explanation: &'static str,
    pub mitigation: &'static str,
}

/// A concrete detector finding, distinct from the catalog entry it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMatch {
    pub pattern_name: String,
    /// Token positions involved, sorted ascending. Empty for advisory
    /// findings that are not tied to specific tokens.
    pub positions: Vec<usize>,
    pub evidence: String,
}

/// Inspection data for a single token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub token: Token,
    /// `U+XXXX` per Unicode scalar of the token text, zero-padded to 4 digits.
    pub unicode_points: Vec<String>,
    /// Space-separated uppercase hex of the raw bytes.
    pub hex_bytes: String,
    /// Space-separated 8-bit binary of the raw bytes.
    pub binary_rep: String,
    /// Position in the vocabulary (the token id).
    pub vocab_rank: u32,
}

/// Why two models produced different tokens at the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DifferenceReason {
    /// One side's token text is not in the other side's vocabulary at all.
    Vocabulary,
    /// Both vocabularies know both texts; the merge order diverged.
    MergeStrategy,
    /// A reserved token was involved on at least one side.
    SpecialHandling,
}

/// Positional difference between two models' encodings of the same input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDifference {
    pub position: usize,
    pub left: String,
    pub right: String,
    pub reason: DifferenceReason,
}

/// Side-by-side encoding of one input under two models.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparativeResult {
    pub input: String,
    pub left_model: ModelId,
    pub right_model: ModelId,
    pub left: TokenizerResult,
    pub right: TokenizerResult,
    pub differences: Vec<TokenDifference>,
}
