//! Sentence segmentation for speech output.
//!
//! Splits an utterance into speakable chunks on `.` or `?` followed by
//! whitespace. Two guards keep dotted abbreviations ("e.g.", "U.S.") and
//! capitalized honorifics ("Dr.", "Mr.") in one piece. This is a boundary
//! heuristic, not a parser; it hides behind the [`Segmenter`] function type
//! so a real sentence-boundary model can replace it without touching the
//! playback driver.

use regex::Regex;
use std::sync::OnceLock;

/// Pluggable segmentation function used by the playback driver.
pub type Segmenter = fn(&str) -> Vec<String>;

fn boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.?]\s").expect("boundary regex is valid"))
}

/// Split `text` into sentence-sized chunks, in speaking order.
///
/// Empty input yields no chunks; input without a boundary yields a single
/// chunk equal to the whole input. The single whitespace character at each
/// boundary is consumed; whitespace is otherwise left as-is.
pub fn split_sentences(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut chunks = Vec::new();
    let mut start = 0usize;
    for m in boundary_re().find_iter(text) {
        // '.' and '?' are single-byte; the matched whitespace may not be.
        let punct_end = m.start() + 1;
        if keeps_together(&text[..punct_end]) {
            continue;
        }
        if punct_end > start {
            chunks.push(text[start..punct_end].to_string());
        }
        start = m.end();
    }
    if start < text.len() {
        chunks.push(text[start..].to_string());
    }
    chunks.retain(|chunk| !chunk.is_empty());
    chunks
}

/// True when the text ending at a candidate boundary must stay attached to
/// what follows: a dotted abbreviation (word, '.', word, boundary) or an
/// honorific (uppercase, lowercase, '.') right before the split point.
fn keeps_together(prefix: &str) -> bool {
    let mut rev = prefix.chars().rev();
    let boundary = rev.next();
    let c1 = rev.next();
    let c2 = rev.next();
    let c3 = rev.next();

    if boundary == Some('.') {
        if let (Some(a), Some(b)) = (c2, c1) {
            if a.is_ascii_uppercase() && b.is_ascii_lowercase() {
                return true;
            }
        }
    }
    if let (Some(a), Some(b), Some(c)) = (c3, c2, c1) {
        if is_word(a) && b == '.' && is_word(c) {
            return true;
        }
    }
    false
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
