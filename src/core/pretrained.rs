//! Model registry: the closed set of supported vocabularies and their
//! shared, lazily-built tokenizers.
//!
//! Two real tables are embedded at compile time in tiktoken format:
//! a cl100k-style table for GPT-4 and a Llama-3-style table. Both are
//! compact exact BPE vocabularies (all 256 single bytes plus trained merges),
//! so encode/decode roundtrips exactly. Gemini has no table of its own here
//! and is served by the GPT-4 tokenizer; its label says so, and callers can
//! check [`ModelId::is_approximation`].

use std::fmt;
use std::sync::LazyLock;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::tokenizer::{Tokenizer, TokenizerError, CL100K_BASE_PATTERN, LLAMA3_PATTERN};

/// Compact cl100k-style vocabulary (GPT-4 family).
pub const CL100K_MINI_VOCAB: &[u8] = include_bytes!("../../vocabs/cl100k_mini.tiktoken");

/// Compact Llama-3-style vocabulary.
pub const LLAMA3_MINI_VOCAB: &[u8] = include_bytes!("../../vocabs/llama3_mini.tiktoken");

static GPT4_TOKENIZER: LazyLock<Tokenizer> = LazyLock::new(|| {
    Tokenizer::from_bytes(CL100K_MINI_VOCAB, CL100K_BASE_PATTERN, gpt4_special_tokens())
        .expect("embedded cl100k vocabulary is valid")
});

static LLAMA3_TOKENIZER: LazyLock<Tokenizer> = LazyLock::new(|| {
    Tokenizer::from_bytes(LLAMA3_MINI_VOCAB, LLAMA3_PATTERN, llama3_special_tokens())
        .expect("embedded llama3 vocabulary is valid")
});

/// The closed set of supported target models.
///
/// The model set is fixed at compile time, so dispatch is a plain enum match
/// rather than open-ended dynamic dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "llama-3")]
    Llama3,
    #[serde(rename = "gemini")]
    Gemini,
}

impl ModelId {
    /// Resolve a model name. Unknown names are an error, never a silent
    /// fallback.
    pub fn from_name(name: &str) -> Result<Self, TokenizerError> {
        match name {
            "gpt-4" | "gpt4" => Ok(Self::Gpt4),
            "llama-3" | "llama3" => Ok(Self::Llama3),
            "gemini" => Ok(Self::Gemini),
            _ => Err(TokenizerError::UnknownModel(format!(
                "{}. Supported: {}",
                name,
                Self::supported_names().join(", ")
            ))),
        }
    }

    /// Canonical names accepted by [`ModelId::from_name`].
    pub fn supported_names() -> &'static [&'static str] {
        &["gpt-4", "llama-3", "gemini"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpt4 => "gpt-4",
            Self::Llama3 => "llama-3",
            Self::Gemini => "gemini",
        }
    }

    /// Whether this model is served by another model's vocabulary.
    pub fn is_approximation(&self) -> bool {
        matches!(self, Self::Gemini)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelId {
    type Err = TokenizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// The shared tokenizer serving a model.
pub fn tokenizer_for(model: ModelId) -> &'static Tokenizer {
    match model {
        // Gemini rides on the GPT-4 table; see the module docs.
        ModelId::Gpt4 | ModelId::Gemini => &GPT4_TOKENIZER,
        ModelId::Llama3 => &LLAMA3_TOKENIZER,
    }
}

/// Human-readable vocabulary description, naming any approximation.
pub fn vocabulary_label(model: ModelId) -> &'static str {
    match model {
        ModelId::Gpt4 => "GPT-4 (cl100k-style compact vocabulary)",
        ModelId::Llama3 => "Llama 3 (compact 128k-style vocabulary)",
        ModelId::Gemini => "Gemini (approximation using the GPT-4 compact vocabulary)",
    }
}

/// Reserved tokens for the GPT-4 table, at their canonical cl100k ids.
pub fn gpt4_special_tokens() -> FxHashMap<String, u32> {
    let mut special = FxHashMap::default();
    special.insert("<|endoftext|>".to_string(), 100257);
    special.insert("<|fim_prefix|>".to_string(), 100258);
    special.insert("<|fim_middle|>".to_string(), 100259);
    special.insert("<|fim_suffix|>".to_string(), 100260);
    special.insert("<|endofprompt|>".to_string(), 100276);
    special
}

/// Reserved tokens for the Llama 3 table, at their canonical ids.
pub fn llama3_special_tokens() -> FxHashMap<String, u32> {
    let mut special = FxHashMap::default();
    special.insert("<|begin_of_text|>".to_string(), 128000);
    special.insert("<|end_of_text|>".to_string(), 128001);
    special.insert("<|start_header_id|>".to_string(), 128006);
    special.insert("<|end_header_id|>".to_string(), 128007);
    special.insert("<|eom_id|>".to_string(), 128008);
    special.insert("<|eot_id|>".to_string(), 128009);
    special.insert("<|python_tag|>".to_string(), 128010);
    special
}
