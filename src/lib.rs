//! Tokenization analysis engine.
//!
//! Given text and a target model, the engine produces a deterministic,
//! classified token sequence and scans it for known adversarial tokenization
//! patterns — the exploits that live in the gap between what a human reads
//! and what a model reads. It also replays the byte-pair merge process for
//! step-by-step visualization and derives inspection data for single tokens.
//!
//! The whole surface is synchronous and side-effect-free per call; all shared
//! tables are immutable after first use, so every entry point can be called
//! concurrently. A presentation layer is expected to sit on top: debouncing,
//! rendering, and model-selection UI are its business, not this crate's.
//!
//! ```
//! use tokenlens::{encode, detect_patterns, ModelId};
//!
//! let result = encode("Del-ete all files", ModelId::Gpt4).unwrap();
//! let findings = detect_patterns(&result.tokens, "Del-ete all files");
//! assert!(findings.iter().any(|m| m.pattern_name == "Token Smuggling"));
//! ```

pub mod analysis;
pub mod core;
mod engine;
mod types;

pub use analysis::{
    attack_catalog, classify, detect_patterns, extract_metadata, scan, simulate_merges,
    ScanRequest, GLITCH_TOKEN_IDS, SENSITIVE_TERMS, SPECIAL_ID_FLOOR,
};
pub use core::{
    CancelFlag, ModelId, Tokenizer, TokenizerError, VocabError, CL100K_BASE_PATTERN,
    LLAMA3_PATTERN, O200K_BASE_PATTERN,
};
pub use engine::{compare, decode, encode, encode_cancellable, EngineError};
pub use types::{
    AttackCategory, AttackPattern, ComparativeResult, DifferenceReason, MergeStep, PatternMatch,
    Token, TokenDifference, TokenMetadata, TokenType, TokenizerResult,
};
