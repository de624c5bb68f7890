//! Fixed-size overlapping text chunker.
//!
//! Splits document text into windows of `size` characters, each starting
//! `size - overlap` characters after the previous one, so consecutive chunks
//! share exactly `overlap` characters of context. The final chunk ends at the
//! end of the text and may be shorter than `size`; it is never padded or
//! dropped.
//!
//! Lengths and offsets are counted in `char`s, never bytes, so multi-byte
//! text is never cut in the middle of a character.
//!
//! ```text
//! text:    |0 ...................................... 2400|
//! chunk 0: [0 ........ 1000)
//! chunk 1:          [800 ........ 1800)
//! chunk 2:                    [1600 ........ 2400)
//! ```

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// A chunk's position within the source text, in character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Validated chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker; fails unless `size > overlap`.
    ///
    /// `size > 0` follows, since `overlap` is unsigned.
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::invalid_config("chunk size must be > 0"));
        }
        if overlap >= size {
            return Err(Error::invalid_config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, size
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the starts of consecutive chunks.
    pub fn stride(&self) -> usize {
        self.size - self.overlap
    }

    /// Split `text` into spans in a single left-to-right pass.
    pub fn spans(&self, text: &str) -> Vec<ChunkSpan> {
        // Byte offset of every char boundary, plus the end of the text.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_len = boundaries.len() - 1;

        let mut spans = Vec::new();
        let mut start = 0;
        while start < char_len {
            let end = (start + self.size).min(char_len);
            spans.push(ChunkSpan {
                index: spans.len(),
                start,
                end,
                text: text[boundaries[start]..boundaries[end]].to_string(),
            });
            if end == char_len {
                break;
            }
            start += self.stride();
        }
        spans
    }

    /// Split `text` into chunk strings.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.spans(text).into_iter().map(|s| s.text).collect()
    }
}

/// Split `text` into overlapping chunks of at most `size` characters.
///
/// Convenience wrapper around [`Chunker`] for one-off use.
pub fn split_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(Chunker::new(size, overlap)?.split(text))
}

/// Hex-encoded SHA-256 of a chunk's text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
