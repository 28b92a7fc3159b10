//! Text decoding for CSV payloads of unknown charset.
//!
//! Publications arrive as UTF-8 (with or without BOM) or legacy Big5, with
//! no declared charset. [`SniffingDecoder`] guesses from a short prefix of
//! the UTF-8 decode; [`FixedDecoder`] skips the guess entirely.

use std::borrow::Cow;

use encoding_rs::{BIG5, Encoding, UTF_8};
use tracing::debug;

use twcal_shared::{CalendarError, Result};

/// UTF-8 byte-order mark.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Number of decoded characters inspected by the sniffing heuristic.
const SAMPLE_CHARS: usize = 200;

/// Turns a raw payload into text.
pub trait TextDecoder: Send + Sync {
    /// Decode `bytes`, failing when no supported encoding applies.
    fn decode(&self, bytes: &[u8]) -> Result<String>;

    /// Human-readable decoder name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// SniffingDecoder
// ---------------------------------------------------------------------------

/// UTF-8 first, falling back to a legacy encoding when the UTF-8 reading
/// does not look like Chinese text.
///
/// Valid calendar payloads always contain Chinese in their headers and
/// descriptions, so a prefix with no CJK ideograph (or with replacement
/// characters) means the bytes were not UTF-8.
#[derive(Debug, Clone, Copy)]
pub struct SniffingDecoder {
    fallback: &'static Encoding,
    sample_chars: usize,
}

impl SniffingDecoder {
    /// Sniffer with a custom fallback encoding.
    pub fn with_fallback(fallback: &'static Encoding) -> Self {
        Self {
            fallback,
            sample_chars: SAMPLE_CHARS,
        }
    }
}

impl Default for SniffingDecoder {
    fn default() -> Self {
        Self::with_fallback(BIG5)
    }
}

impl TextDecoder for SniffingDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<String> {
        if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
            debug!("detected UTF-8 with BOM");
            let (text, _) = UTF_8.decode_without_bom_handling(rest);
            return Ok(text.into_owned());
        }

        let (text, _) = UTF_8.decode_without_bom_handling(bytes);
        if sample_looks_chinese(&text, self.sample_chars) {
            debug!("detected UTF-8 without BOM");
            return Ok(text.into_owned());
        }

        debug!(fallback = self.fallback.name(), "UTF-8 sample rejected, re-decoding");
        let text = decode_strict(self.fallback, bytes)?;
        debug!(sample = %text.chars().take(100).collect::<String>(), "decoded with fallback");
        Ok(text)
    }

    fn name(&self) -> &str {
        "sniffing"
    }
}

/// The first `limit` characters contain a CJK ideograph and no U+FFFD.
fn sample_looks_chinese(text: &str, limit: usize) -> bool {
    let mut has_cjk = false;
    for c in text.chars().take(limit) {
        if c == char::REPLACEMENT_CHARACTER {
            return false;
        }
        has_cjk |= is_cjk_ideograph(c);
    }
    has_cjk
}

/// CJK Unified Ideographs block.
fn is_cjk_ideograph(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

// ---------------------------------------------------------------------------
// FixedDecoder
// ---------------------------------------------------------------------------

/// Always decodes with one encoding, rejecting malformed input.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecoder {
    encoding: &'static Encoding,
}

impl FixedDecoder {
    /// Decoder for a WHATWG encoding label such as `utf-8` or `big5`.
    pub fn for_label(label: &str) -> Result<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .map(|encoding| Self { encoding })
            .ok_or_else(|| CalendarError::config(format!("unknown encoding label '{label}'")))
    }
}

impl TextDecoder for FixedDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<String> {
        let bytes = if self.encoding == UTF_8 {
            bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
        } else {
            bytes
        };
        decode_strict(self.encoding, bytes)
    }

    fn name(&self) -> &str {
        self.encoding.name()
    }
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Result<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
        .ok_or_else(|| {
            CalendarError::decode(format!("payload is not valid {}", encoding.name()))
        })
}
