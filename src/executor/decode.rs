//! Fallback decoding of child process output.
//!
//! Child processes write bytes in whatever encoding the host shell happens to
//! use. Output is decoded by trying an ordered list of candidate decoders; the
//! first one that accepts the whole buffer wins. When every candidate rejects
//! the input, the first candidate is applied again with replacement
//! characters, so decoding itself never fails.

use encoding_rs::{Encoding, UTF_8};

/// A single candidate text decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// Any WHATWG encoding provided by `encoding_rs`.
    Whatwg(&'static Encoding),
    /// UTF-16 with optional byte order mark, little-endian when absent.
    Utf16,
    /// ISO-8859-1. Total: every byte maps to the code point of equal value.
    Latin1,
}

impl Decoder {
    /// Resolve an encoding label such as `utf-8`, `euc-kr` or `windows-949`.
    ///
    /// `latin1`/`iso-8859-1` and `utf-16` are handled here rather than by
    /// `encoding_rs`, which maps them to windows-1252 and UTF-16LE.
    pub fn for_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" | "l1" => Some(Self::Latin1),
            "utf-16" | "utf16" => Some(Self::Utf16),
            other => Encoding::for_label(other.as_bytes()).map(Self::Whatwg),
        }
    }

    /// Regional code page tried first on this platform.
    ///
    /// Windows consoles in the deployment this server targets run on the
    /// Korean code page (949). Elsewhere the shell speaks UTF-8 and no
    /// regional step is needed.
    pub fn platform_regional() -> Option<Self> {
        if cfg!(windows) {
            Self::for_label("windows-949")
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Whatwg(encoding) => encoding.name(),
            Self::Utf16 => "UTF-16",
            Self::Latin1 => "ISO-8859-1",
        }
    }

    /// Decode the entire buffer or return `None` on the first malformed sequence.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Whatwg(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
            Self::Utf16 => decode_utf16(bytes, false),
            Self::Latin1 => Some(decode_latin1(bytes)),
        }
    }

    /// Decode the entire buffer, substituting U+FFFD for malformed sequences.
    pub fn decode_lossy(&self, bytes: &[u8]) -> String {
        match self {
            Self::Whatwg(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
            Self::Utf16 => decode_utf16(bytes, true).unwrap_or_default(),
            Self::Latin1 => decode_latin1(bytes),
        }
    }
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

fn decode_utf16(bytes: &[u8], lossy: bool) -> Option<String> {
    let (body, big_endian) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (rest, false),
        [0xFE, 0xFF, rest @ ..] => (rest, true),
        _ => (bytes, false),
    };

    let (units, remainder) = body.split_at(body.len() - body.len() % 2);
    if !remainder.is_empty() && !lossy {
        return None;
    }

    let units = units.chunks_exact(2).map(|pair| {
        let pair = [pair[0], pair[1]];
        if big_endian {
            u16::from_be_bytes(pair)
        } else {
            u16::from_le_bytes(pair)
        }
    });

    let mut text = String::with_capacity(body.len() / 2);
    for unit in char::decode_utf16(units) {
        match unit {
            Ok(ch) => text.push(ch),
            Err(_) if lossy => text.push(char::REPLACEMENT_CHARACTER),
            Err(_) => return None,
        }
    }
    if !remainder.is_empty() {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    Some(text)
}

/// Ordered list of candidate decoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderChain {
    candidates: Vec<Decoder>,
}

impl DecoderChain {
    /// Standard chain: optional regional code page, UTF-8, UTF-16, Latin-1.
    pub fn new(regional: Option<Decoder>) -> Self {
        let candidates = regional
            .into_iter()
            .chain([Decoder::Whatwg(UTF_8), Decoder::Utf16, Decoder::Latin1]);
        Self::from_candidates(candidates)
    }

    /// Chain with an explicit candidate order. Duplicates keep their first position.
    pub fn from_candidates<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = Decoder>,
    {
        let mut ordered: Vec<Decoder> = Vec::new();
        for candidate in candidates {
            if !ordered.contains(&candidate) {
                ordered.push(candidate);
            }
        }
        Self { candidates: ordered }
    }

    pub fn candidates(&self) -> &[Decoder] {
        &self.candidates
    }

    /// Decode `bytes` with the first candidate that accepts them.
    pub fn decode(&self, bytes: &[u8]) -> String {
        if bytes.is_empty() {
            return String::new();
        }

        for candidate in &self.candidates {
            if let Some(text) = candidate.decode(bytes) {
                log::trace!("Decoded {} bytes as {}", bytes.len(), candidate.name());
                return text;
            }
        }

        log::debug!(
            "No candidate encoding accepted {} bytes, forcing lossy decode",
            bytes.len()
        );
        match self.candidates.first() {
            Some(first) => first.decode_lossy(bytes),
            None => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

impl Default for DecoderChain {
    fn default() -> Self {
        Self::new(Decoder::platform_regional())
    }
}
