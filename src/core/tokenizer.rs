use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use aho_corasick::AhoCorasick;
use fancy_regex::Regex;
use lru::LruCache;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHasher};
use thiserror::Error;

use super::bpe::byte_pair_encode;
use super::vocab::{build_decoder, load_tiktoken_bpe, VocabError};

#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("regex compilation error: {0}")]
    Regex(#[from] Box<fancy_regex::Error>),
    #[error("vocabulary error: {0}")]
    Vocab(#[from] VocabError),
    #[error("decoding error: invalid UTF-8")]
    Utf8,
    #[error("Aho-Corasick build error: {0}")]
    AhoCorasick(#[from] aho_corasick::BuildError),
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("no vocabulary entry covers the input byte at offset {0}")]
    UnencodableByte(usize),
    #[error("operation cancelled")]
    Cancelled,
}

/// Pre-tokenization pattern for cl100k-style vocabularies (GPT-4 family).
pub const CL100K_BASE_PATTERN: &str = r"(?i:'s|'t|'re|'ve|'m|'ll|'d)|[^\r\n\p{L}\p{N}]?\p{L}+|\p{N}{1,3}| ?[^\s\p{L}\p{N}]+[\r\n]*|\s*[\r\n]+|\s+(?!\S)|\s+";

/// Pre-tokenization pattern for o200k-style vocabularies, also used by the
/// Llama 3 family.
pub const O200K_BASE_PATTERN: &str = r"[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]*[\p{Ll}\p{Lm}\p{Lo}\p{M}]+(?i:'s|'t|'re|'ve|'m|'ll|'d)?|[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]+[\p{Ll}\p{Lm}\p{Lo}\p{M}]*(?i:'s|'t|'re|'ve|'m|'ll|'d)?|\p{N}{1,3}| ?[^\s\p{L}\p{N}]+[\r\n]*|\s*[\r\n]+|\s+(?!\S)|\s+";

/// Pre-tokenization pattern for the Llama 3 family (same as o200k).
pub const LLAMA3_PATTERN: &str = O200K_BASE_PATTERN;

/// Default LRU capacity for encoded chunks.
const DEFAULT_CACHE_SIZE: usize = 4096;

/// How many chunks are encoded between cancellation polls.
const CANCEL_POLL_CHUNKS: usize = 64;

/// Cooperative cancellation flag for long-running encodes and scans.
///
/// Cloning shares the flag; any clone can cancel. Polling happens at chunk
/// granularity, so cancellation is prompt but not instantaneous.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Deterministic BPE tokenizer over one vocabulary table.
///
/// Encoding pre-splits text with the vocabulary's regex pattern, then merges
/// each chunk by rank ([`byte_pair_encode`]). Chunks that are themselves
/// vocabulary entries take a fast path, and chunk results are memoized in an
/// LRU cache keyed by content hash. Special tokens are matched with an
/// Aho-Corasick automaton and bypass BPE entirely.
///
/// All methods take `&self`; the only interior mutability is the cache behind
/// a `Mutex`, so a shared reference can be used from many threads at once.
pub struct Tokenizer {
    encoder: FxHashMap<Vec<u8>, u32>,
    decoder: FxHashMap<u32, Vec<u8>>,
    special_tokens: FxHashMap<String, u32>,
    special_tokens_decoder: FxHashMap<u32, String>,
    special_token_strings: Vec<String>,
    regex: Regex,
    pattern: String,
    special_matcher: Option<AhoCorasick>,
    chunk_cache: Mutex<LruCache<u64, Vec<u32>>>,
    cache_size: usize,
}

impl Tokenizer {
    /// Create a tokenizer from an encoder map, special tokens, and a
    /// pre-tokenization pattern.
    pub fn new(
        encoder: FxHashMap<Vec<u8>, u32>,
        special_tokens: FxHashMap<String, u32>,
        pattern: &str,
    ) -> Result<Self, TokenizerError> {
        Self::with_cache_size(encoder, special_tokens, pattern, DEFAULT_CACHE_SIZE)
    }

    /// Create a tokenizer with a custom chunk-cache capacity.
    pub fn with_cache_size(
        encoder: FxHashMap<Vec<u8>, u32>,
        special_tokens: FxHashMap<String, u32>,
        pattern: &str,
        cache_size: usize,
    ) -> Result<Self, TokenizerError> {
        let decoder = build_decoder(&encoder);
        let special_tokens_decoder: FxHashMap<u32, String> = special_tokens
            .iter()
            .map(|(k, v)| (*v, k.clone()))
            .collect();

        let regex = Regex::new(pattern).map_err(Box::new)?;

        let special_token_strings: Vec<String> = special_tokens.keys().cloned().collect();
        let special_matcher = if special_token_strings.is_empty() {
            None
        } else {
            Some(AhoCorasick::new(&special_token_strings)?)
        };

        let cache_size_nz = NonZeroUsize::new(cache_size.max(1)).unwrap();
        let chunk_cache = Mutex::new(LruCache::new(cache_size_nz));

        Ok(Self {
            encoder,
            decoder,
            special_tokens,
            special_tokens_decoder,
            special_token_strings,
            regex,
            pattern: pattern.to_string(),
            special_matcher,
            chunk_cache,
            cache_size,
        })
    }

    /// Create a tokenizer from tiktoken-format vocabulary bytes.
    pub fn from_bytes(
        vocab_data: &[u8],
        pattern: &str,
        special_tokens: FxHashMap<String, u32>,
    ) -> Result<Self, TokenizerError> {
        let encoder = load_tiktoken_bpe(vocab_data)?;
        Self::new(encoder, special_tokens, pattern)
    }

    /// Pre-split text into chunk byte ranges.
    fn find_chunks(&self, text: &str) -> Vec<(usize, usize)> {
        self.regex
            .find_iter(text)
            .filter_map(|m| m.ok())
            .map(|m| (m.start(), m.end()))
            .collect()
    }

    #[inline]
    fn hash_slice(slice: &[u8]) -> u64 {
        let mut hasher = FxHasher::default();
        slice.hash(&mut hasher);
        hasher.finish()
    }

    /// Encode one chunk, consulting the whole-chunk fast path and the cache.
    ///
    /// `chunk_start` is the chunk's byte offset in the full input, used to
    /// report absolute offsets for unencodable bytes.
    fn encode_chunk(&self, slice: &[u8], chunk_start: usize) -> Result<Vec<u32>, TokenizerError> {
        if let Some(&rank) = self.encoder.get(slice) {
            return Ok(vec![rank]);
        }

        let hash = Self::hash_slice(slice);
        if let Ok(mut cache) = self.chunk_cache.lock() {
            if let Some(cached) = cache.get(&hash) {
                return Ok(cached.clone());
            }
        }

        let result = byte_pair_encode(slice, &self.encoder)
            .map_err(|offset| TokenizerError::UnencodableByte(chunk_start + offset))?;

        if let Ok(mut cache) = self.chunk_cache.lock() {
            cache.put(hash, result.clone());
        }

        Ok(result)
    }

    /// Encode text to token ids (special tokens in the input are treated as
    /// ordinary text, which is the right default for untrusted input).
    pub fn encode(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        self.encode_cancellable(text, None)
    }

    /// Encode with an optional cooperative cancellation flag, polled every
    /// [`CANCEL_POLL_CHUNKS`] chunks.
    pub fn encode_cancellable(
        &self,
        text: &str,
        cancel: Option<&CancelFlag>,
    ) -> Result<Vec<u32>, TokenizerError> {
        let text_bytes = text.as_bytes();
        let chunks = self.find_chunks(text);

        let mut ids = Vec::new();
        for (i, &(start, end)) in chunks.iter().enumerate() {
            if i % CANCEL_POLL_CHUNKS == 0 {
                if let Some(flag) = cancel {
                    if flag.is_cancelled() {
                        return Err(TokenizerError::Cancelled);
                    }
                }
            }
            ids.extend(self.encode_chunk(&text_bytes[start..end], start)?);
        }
        Ok(ids)
    }

    /// Encode text, mapping special-token strings to their reserved ids.
    ///
    /// Only for trusted input: a reserved string inside untrusted text would
    /// otherwise inject a control token.
    pub fn encode_with_special(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        let Some(ref special_matcher) = self.special_matcher else {
            return self.encode(text);
        };

        let mut result = Vec::new();
        let mut last_end = 0;

        for m in special_matcher.find_iter(text.as_bytes()) {
            if m.start() > last_end {
                result.extend(self.encode(&text[last_end..m.start()])?);
            }

            let token_str = &self.special_token_strings[m.pattern().as_usize()];
            if let Some(&rank) = self.special_tokens.get(token_str) {
                result.push(rank);
            }

            last_end = m.end();
        }

        if last_end < text.len() {
            result.extend(self.encode(&text[last_end..])?);
        }

        Ok(result)
    }

    /// Batch encode in parallel across texts.
    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<u32>>, TokenizerError> {
        texts.par_iter().map(|text| self.encode(text)).collect()
    }

    /// Decode token ids to raw bytes. Unknown ids are skipped.
    pub fn decode_bytes(&self, tokens: &[u32]) -> Vec<u8> {
        let mut result = Vec::with_capacity(tokens.len() * 4);

        for &token in tokens {
            if let Some(bytes) = self.decoder.get(&token) {
                result.extend_from_slice(bytes);
            } else if let Some(special) = self.special_tokens_decoder.get(&token) {
                result.extend_from_slice(special.as_bytes());
            }
        }

        result
    }

    /// Decode token ids to a string, failing on invalid UTF-8.
    pub fn decode(&self, tokens: &[u32]) -> Result<String, TokenizerError> {
        String::from_utf8(self.decode_bytes(tokens)).map_err(|_| TokenizerError::Utf8)
    }

    /// Decode token ids to a string, replacing invalid UTF-8.
    pub fn decode_lossy(&self, tokens: &[u32]) -> String {
        String::from_utf8_lossy(&self.decode_bytes(tokens)).into_owned()
    }

    /// Batch decode in parallel.
    pub fn decode_batch(&self, token_lists: &[Vec<u32>]) -> Result<Vec<String>, TokenizerError> {
        token_lists
            .par_iter()
            .map(|tokens| self.decode(tokens))
            .collect()
    }

    /// Raw bytes of a single vocabulary token, if the id is known.
    pub fn token_bytes(&self, id: u32) -> Option<&[u8]> {
        self.decoder
            .get(&id)
            .map(Vec::as_slice)
            .or_else(|| self.special_tokens_decoder.get(&id).map(String::as_bytes))
    }

    /// Total vocabulary range: `max_token_id + 1` across BPE and special ids.
    pub fn vocab_size(&self) -> usize {
        let max_decoder_id = self.decoder.keys().max().copied().unwrap_or(0);
        let max_special_id = self.special_tokens.values().max().copied().unwrap_or(0);
        (max_decoder_id.max(max_special_id) + 1) as usize
    }

    /// The encoder map (token bytes → id).
    pub fn encoder(&self) -> &FxHashMap<Vec<u8>, u32> {
        &self.encoder
    }

    /// The special tokens map (string → id).
    pub fn special_tokens(&self) -> &FxHashMap<String, u32> {
        &self.special_tokens
    }

    /// Drop all memoized chunk encodings.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.chunk_cache.lock() {
            cache.clear();
        }
    }

    /// Number of chunk encodings currently memoized.
    pub fn cache_len(&self) -> usize {
        self.chunk_cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl Clone for Tokenizer {
    fn clone(&self) -> Self {
        // Pattern compiled successfully once, so recompiling cannot fail.
        let regex = Regex::new(&self.pattern).unwrap();

        let special_matcher = if self.special_token_strings.is_empty() {
            None
        } else {
            Some(AhoCorasick::new(&self.special_token_strings).unwrap())
        };

        // Caches are not shared between clones.
        let cache_size_nz = NonZeroUsize::new(self.cache_size.max(1)).unwrap();
        let chunk_cache = Mutex::new(LruCache::new(cache_size_nz));

        Self {
            encoder: self.encoder.clone(),
            decoder: self.decoder.clone(),
            special_tokens: self.special_tokens.clone(),
            special_tokens_decoder: self.special_tokens_decoder.clone(),
            special_token_strings: self.special_token_strings.clone(),
            regex,
            pattern: self.pattern.clone(),
            special_matcher,
            chunk_cache,
            cache_size: self.cache_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_tokenizer() -> Tokenizer {
        let mut encoder = FxHashMap::default();
        for b in 0u8..=255 {
            encoder.insert(vec![b], b as u32);
        }
        encoder.insert(b"Hello".to_vec(), 300);
        encoder.insert(b"World".to_vec(), 301);
        encoder.insert(b" World".to_vec(), 302);

        let mut special_tokens = FxHashMap::default();
        special_tokens.insert("<|endoftext|>".to_string(), 50256);

        Tokenizer::new(encoder, special_tokens, r"\S+|\s+").unwrap()
    }

    #[test]
    fn encode_decode_roundtrip() {
        let tokenizer = make_test_tokenizer();
        let text = "Hello World";
        let tokens = tokenizer.encode(text).unwrap();
        assert_eq!(tokenizer.decode(&tokens).unwrap(), text);
    }

    #[test]
    fn whole_chunk_fast_path() {
        let tokenizer = make_test_tokenizer();
        assert_eq!(tokenizer.encode("Hello").unwrap(), vec![300]);
    }

    #[test]
    fn special_strings_in_plain_encode_stay_text() {
        let tokenizer = make_test_tokenizer();
        let tokens = tokenizer.encode("Hi<|endoftext|>").unwrap();
        assert!(!tokens.contains(&50256));
        assert_eq!(tokenizer.decode(&tokens).unwrap(), "Hi<|endoftext|>");
    }

    #[test]
    fn encode_with_special_maps_reserved_strings() {
        let tokenizer = make_test_tokenizer();
        let tokens = tokenizer.encode_with_special("Hello<|endoftext|>World").unwrap();
        assert!(tokens.contains(&50256));
        assert_eq!(
            tokenizer.decode(&tokens).unwrap(),
            "Hello<|endoftext|>World"
        );
    }

    #[test]
    fn batch_matches_individual() {
        let tokenizer = make_test_tokenizer();
        let texts = vec!["Hello".to_string(), "Hello World".to_string()];
        let batch = tokenizer.encode_batch(&texts).unwrap();
        for (text, ids) in texts.iter().zip(&batch) {
            assert_eq!(ids, &tokenizer.encode(text).unwrap());
        }
    }

    #[test]
    fn unknown_ids_skipped_in_decode() {
        let tokenizer = make_test_tokenizer();
        assert_eq!(tokenizer.decode(&[300, 999_999]).unwrap(), "Hello");
    }

    #[test]
    fn cache_fills_and_clears() {
        let tokenizer = make_test_tokenizer();
        tokenizer.encode("HelloWorld").unwrap();
        assert!(tokenizer.cache_len() > 0);
        tokenizer.clear_cache();
        assert_eq!(tokenizer.cache_len(), 0);
    }

    #[test]
    fn cancelled_flag_aborts_encode() {
        let tokenizer = make_test_tokenizer();
        let flag = CancelFlag::new();
        flag.cancel();
        let err = tokenizer
            .encode_cancellable("Hello World", Some(&flag))
            .unwrap_err();
        assert!(matches!(err, TokenizerError::Cancelled));
    }

    #[test]
    fn unencodable_byte_reports_absolute_offset() {
        let mut encoder = FxHashMap::default();
        for b in b'a'..=b'z' {
            encoder.insert(vec![b], b as u32);
        }
        encoder.insert(vec![b' '], 1000);
        let tokenizer = Tokenizer::new(encoder, FxHashMap::default(), r"\S+|\s+").unwrap();

        let err = tokenizer.encode("abc d!f").unwrap_err();
        assert!(matches!(err, TokenizerError::UnencodableByte(5)));
    }

    #[test]
    fn clone_encodes_identically() {
        let tokenizer = make_test_tokenizer();
        let clone = tokenizer.clone();
        let text = "Hello World and more";
        assert_eq!(
            tokenizer.encode(text).unwrap(),
            clone.encode(text).unwrap()
        );
        assert!(clone.cache_len() > 0);
    }
}
