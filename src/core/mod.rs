//! Tokenization core: vocabularies, byte-pair merging, and the per-model
//! tokenizers.
//!
//! The pipeline is the classic tiktoken shape. Text is pre-split into chunks
//! by a per-vocabulary regex, each chunk is merged bottom-up by vocabulary
//! rank ([`bpe`]), and special tokens are matched separately with an
//! Aho-Corasick automaton. Chunk encodings are memoized in an LRU cache.
//!
//! - [`Tokenizer`]: encode/decode over one vocabulary table
//! - [`bpe`]: rank-greedy byte-pair merging for a single chunk
//! - [`vocab`]: tiktoken-format table loading
//! - [`byte_level`]: byte ↔ display-character alphabet for rendering tokens
//!   that are not valid UTF-8 on their own
//! - [`pretrained`]: the closed model set ([`ModelId`]) and its shared,
//!   lazily-built tokenizers over embedded compact vocabularies

mod bpe;
pub mod byte_level;
mod pretrained;
mod tokenizer;
mod vocab;

pub use bpe::byte_pair_encode;
pub use byte_level::{byte_level_decode, byte_level_encode, is_byte_marker_char};
pub use pretrained::{
    gpt4_special_tokens, llama3_special_tokens, tokenizer_for, vocabulary_label, ModelId,
    CL100K_MINI_VOCAB, LLAMA3_MINI_VOCAB,
};
pub use tokenizer::{
    CancelFlag, Tokenizer, TokenizerError, CL100K_BASE_PATTERN, LLAMA3_PATTERN,
    O200K_BASE_PATTERN,
};
pub use vocab::{build_decoder, load_tiktoken_bpe, VocabError};
