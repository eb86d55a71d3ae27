//! Pattern scanning: run every detector family over one token sequence and
//! collect their findings.
//!
//! The families are independent pure functions. The orchestration loop runs
//! each behind `catch_unwind`, so one family's fault costs only its own
//! findings; the rest still report. Matches carry the catalog name of their
//! pattern so callers can join them back to [`attack_catalog`] entries.
//!
//! [`attack_catalog`]: super::catalog::attack_catalog

use std::panic::{catch_unwind, AssertUnwindSafe};

use base64::{engine::general_purpose::STANDARD, Engine};
use rustc_hash::FxHashSet;

use crate::core::CancelFlag;
use crate::types::{PatternMatch, Token};

use super::catalog::{is_glitch_id, SENSITIVE_TERMS, SENSITIVE_TERM_MATCHER};

/// Smuggling reconstruction looks at this many adjacent tokens at most.
/// Two and three cover the fragmentations seen in practice.
const SMUGGLING_WINDOW_MIN: usize = 2;
const SMUGGLING_WINDOW_MAX: usize = 3;

/// Shortest base64-alphabet run worth flagging. Shorter runs collide with
/// ordinary words far too often.
const BASE64_MIN_LEN: usize = 16;

/// One scan invocation: the token sequence, the raw text it came from, and
/// caller-supplied context the token stream cannot carry itself.
pub struct ScanRequest<'a> {
    pub tokens: &'a [Token],
    pub raw_text: &'a str,
    /// How many originally-separate input fields were concatenated to form
    /// `raw_text`. Anything above 1 raises the payload-splitting advisory.
    pub concatenated_fields: usize,
    /// Optional cooperative cancellation; a cancelled scan returns the
    /// findings gathered so far.
    pub cancel: Option<&'a CancelFlag>,
}

impl<'a> ScanRequest<'a> {
    pub fn new(tokens: &'a [Token], raw_text: &'a str) -> Self {
        Self {
            tokens,
            raw_text,
            concatenated_fields: 1,
            cancel: None,
        }
    }

    pub fn with_fields(mut self, concatenated_fields: usize) -> Self {
        self.concatenated_fields = concatenated_fields;
        self
    }

    pub fn with_cancel(mut self, cancel: &'a CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Scan a token sequence for all known pattern families.
pub fn detect_patterns(tokens: &[Token], raw_text: &str) -> Vec<PatternMatch> {
    scan(&ScanRequest::new(tokens, raw_text))
}

/// Scan with caller-supplied context ([`ScanRequest`]).
pub fn scan(request: &ScanRequest<'_>) -> Vec<PatternMatch> {
    type Detector = (&'static str, fn(&ScanRequest<'_>) -> Vec<PatternMatch>);
    const DETECTORS: [Detector; 4] = [
        ("Token Smuggling", detect_token_smuggling),
        ("Glitch Tokens", detect_glitch_tokens),
        ("Payload Splitting", detect_payload_splitting),
        ("Base64 Obfuscation", detect_base64_obfuscation),
    ];

    let mut matches = Vec::new();
    for (family, detector) in DETECTORS {
        if request.cancel.is_some_and(CancelFlag::is_cancelled) {
            break;
        }
        match catch_unwind(AssertUnwindSafe(|| detector(request))) {
            Ok(found) => matches.extend(found),
            Err(_) => {
                tracing::warn!(family, "pattern detector panicked; its findings are skipped");
            }
        }
    }
    matches
}

/// Lowercase and drop whitespace, hyphens, and underscores — the separators
/// an attacker uses to break up a term without changing what the model reads.
fn normalize_fragment(text: &str, out: &mut String) {
    for ch in text.chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            continue;
        }
        out.extend(ch.to_lowercase());
    }
}

/// Sensitive terms reconstructed across adjacent tokens.
///
/// A term realized by a single token is ordinary vocabulary and never
/// flagged; a match counts only when it spans at least two of the window's
/// tokens after normalization.
fn detect_token_smuggling(request: &ScanRequest<'_>) -> Vec<PatternMatch> {
    let tokens = request.tokens;
    let mut matches = Vec::new();
    let mut seen: FxHashSet<(usize, Vec<usize>)> = FxHashSet::default();

    for width in SMUGGLING_WINDOW_MIN..=SMUGGLING_WINDOW_MAX {
        if tokens.len() < width {
            break;
        }
        for start in 0..=tokens.len() - width {
            let window = &tokens[start..start + width];

            // Normalized concatenation plus the offset where each token's
            // contribution begins, for the span check below.
            let mut normalized = String::new();
            let mut bounds = Vec::with_capacity(width + 1);
            for token in window {
                bounds.push(normalized.len());
                normalize_fragment(&token.text, &mut normalized);
            }
            bounds.push(normalized.len());

            for m in SENSITIVE_TERM_MATCHER.find_iter(&normalized) {
                let involved: Vec<usize> = (0..width)
                    .filter(|&i| m.start() < bounds[i + 1] && m.end() > bounds[i])
                    .map(|i| start + i)
                    .collect();
                if involved.len() < 2 {
                    continue;
                }

                let term = SENSITIVE_TERMS[m.pattern().as_usize()];
                if seen.insert((m.pattern().as_usize(), involved.clone())) {
                    let fragments: Vec<&str> = involved
                        .iter()
                        .map(|&p| tokens[p].text.as_str())
                        .collect();
                    matches.push(PatternMatch {
                        pattern_name: "Token Smuggling".to_string(),
                        positions: involved,
                        evidence: format!(
                            "\"{}\" reconstructed from adjacent tokens {:?}",
                            term, fragments
                        ),
                    });
                }
            }
        }
    }

    matches
}

/// Known-glitch ids, flagged wherever they occur.
fn detect_glitch_tokens(request: &ScanRequest<'_>) -> Vec<PatternMatch> {
    request
        .tokens
        .iter()
        .filter(|token| is_glitch_id(token.id))
        .map(|token| PatternMatch {
            pattern_name: "Glitch Tokens".to_string(),
            positions: vec![token.position],
            evidence: format!("{:?} (id {}) is a catalogued glitch token", token.text, token.id),
        })
        .collect()
}

/// Advisory only: the exploit lives in application-level concatenation, not
/// in the token stream, so it fires purely on the caller's field count.
fn detect_payload_splitting(request: &ScanRequest<'_>) -> Vec<PatternMatch> {
    if request.concatenated_fields <= 1 {
        return Vec::new();
    }
    vec![PatternMatch {
        pattern_name: "Payload Splitting".to_string(),
        positions: Vec::new(),
        evidence: format!(
            "{} separately entered fields were concatenated before encoding; \
             screen the assembled prompt as a whole",
            request.concatenated_fields
        ),
    }]
}

#[inline]
fn is_base64_alphabet(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='
}

/// Shape check for one alphabet run: long enough, padded correctly, and not
/// a bare number.
fn looks_like_base64(run: &str) -> bool {
    if run.len() < BASE64_MIN_LEN || run.len() % 4 != 0 {
        return false;
    }
    let body = run.trim_end_matches('=');
    if run.len() - body.len() > 2 || body.contains('=') {
        return false;
    }
    body.bytes().any(|b| b.is_ascii_alphabetic())
}

/// Token positions whose byte spans overlap `[start, end)` of the raw text.
fn positions_overlapping(tokens: &[Token], start: usize, end: usize) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut offset = 0;
    for token in tokens {
        let next = offset + token.bytes.len();
        if offset < end && next > start {
            positions.push(token.position);
        }
        offset = next;
    }
    positions
}

/// Encoded-payload shapes in the raw text.
///
/// Works on raw substrings rather than tokens: the whole point of the
/// exploit is that token boundaries hide the payload.
fn detect_base64_obfuscation(request: &ScanRequest<'_>) -> Vec<PatternMatch> {
    let bytes = request.raw_text.as_bytes();
    let mut matches = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if !is_base64_alphabet(bytes[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && is_base64_alphabet(bytes[i]) {
            i += 1;
        }
        let run = &request.raw_text[start..i];
        if looks_like_base64(run) && STANDARD.decode(run).is_ok() {
            matches.push(PatternMatch {
                pattern_name: "Base64 Obfuscation".to_string(),
                positions: positions_overlapping(request.tokens, start, i),
                evidence: format!("{:?} has the shape of a base64-encoded payload", run),
            });
        }
    }

    matches
}
