//! Delimiter and encoding detection over raw file samples.
//!
//! Both detectors are best-effort scoring functions: they always return a
//! usable guess and never fail. Callers that know better (explicit CLI flag,
//! schema metadata) simply skip them.

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

/// Candidate delimiters in tie-break order; comma wins a draw.
pub const DELIMITER_CANDIDATES: &[u8] = &[b',', b';', b'\t', b'|'];

/// Number of sample lines inspected when scoring delimiters.
const DELIMITER_SAMPLE_LINES: usize = 5;

/// Number of bytes inspected when classifying an un-BOMed buffer.
const ENCODING_SAMPLE_BYTES: usize = 1000;

/// Fraction of sampled bytes that must be ASCII for the `Ascii` verdict.
const ASCII_THRESHOLD: f64 = 0.95;

/// Picks the delimiter that splits the sample lines most often.
///
/// Candidates are scored by summing their occurrence count across the first
/// five non-empty lines. Ties resolve in [`DELIMITER_CANDIDATES`] order, so a
/// sample with equal comma and semicolon counts still reads as CSV.
pub fn detect_delimiter(sample: &str) -> u8 {
    let mut best = DELIMITER_CANDIDATES[0];
    let mut best_score = 0usize;
    for &candidate in DELIMITER_CANDIDATES {
        let score: usize = sample
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(DELIMITER_SAMPLE_LINES)
            .map(|line| line.bytes().filter(|b| *b == candidate).count())
            .sum();
        if score > best_score {
            best = candidate;
            best_score = score;
        }
    }
    best
}

/// Verdict of [`detect_encoding`], keeping the BOM/ASCII distinction that a
/// plain `&'static Encoding` would erase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    Ascii,
}

impl DetectedEncoding {
    /// The `encoding_rs` encoding to decode with. ASCII decodes as UTF-8
    /// since it is a strict subset.
    pub fn encoding(&self) -> &'static Encoding {
        match self {
            DetectedEncoding::Utf8 | DetectedEncoding::Utf8Bom | DetectedEncoding::Ascii => UTF_8,
            DetectedEncoding::Utf16Le => UTF_16LE,
            DetectedEncoding::Utf16Be => UTF_16BE,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DetectedEncoding::Utf8 => "utf-8",
            DetectedEncoding::Utf8Bom => "utf-8 (BOM)",
            DetectedEncoding::Utf16Le => "utf-16le",
            DetectedEncoding::Utf16Be => "utf-16be",
            DetectedEncoding::Ascii => "ascii",
        }
    }
}

/// Classifies a byte buffer's encoding: BOM prefixes first, then an ASCII
/// ratio check over the first 1000 bytes, defaulting to UTF-8.
pub fn detect_encoding(bytes: &[u8]) -> DetectedEncoding {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return DetectedEncoding::Utf8Bom;
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return DetectedEncoding::Utf16Le;
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return DetectedEncoding::Utf16Be;
    }

    let sample = &bytes[..bytes.len().min(ENCODING_SAMPLE_BYTES)];
    if sample.is_empty() {
        return DetectedEncoding::Utf8;
    }
    let ascii = sample.iter().filter(|b| **b < 128).count();
    if ascii as f64 / sample.len() as f64 >= ASCII_THRESHOLD {
        DetectedEncoding::Ascii
    } else {
        DetectedEncoding::Utf8
    }
}
