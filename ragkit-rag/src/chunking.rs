//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and three implementations:
//!
//! - [`FixedSizeChunker`]: fixed character windows with configurable overlap
//! - [`RecursiveChunker`]: splits by a prioritized separator list, coarse to fine
//! - [`SentenceChunker`]: groups whole sentences up to a size limit
//!
//! All sizes and offsets are measured in characters (Unicode scalar values),
//! never bytes, so multi-byte text is never cut inside a code point.

use std::ops::Range;

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// Separators used by [`RecursiveChunker`] when none are configured:
/// paragraph break, line break, sentence boundary, word boundary, characters.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// A strategy for splitting documents into chunks.
///
/// Implementations are deterministic: the same document and configuration
/// always produce the same chunks. Positions are contiguous from 0 and ids
/// follow [`Chunk::make_id`].
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Check the `chunk_size` / `chunk_overlap` pair shared by the windowing chunkers.
pub(crate) fn validate_window(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::ConfigError(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Byte offset of every char in `text`, plus `text.len()` as the final entry.
fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect()
}

/// Character windows `[start, start + size)` advancing by `size - overlap`.
///
/// Stops after the first window that reaches the end of the text, so no
/// trailing window made only of overlap is produced.
fn window_spans(len: usize, size: usize, overlap: usize) -> Vec<Range<usize>> {
    let step = size - overlap;
    let mut spans = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + size).min(len);
        spans.push(start..end);
        if end == len {
            break;
        }
        start += step;
    }
    spans
}

/// Slice `text` into character windows, returning byte ranges offset by `base`.
fn hard_split(text: &str, base: usize, size: usize, overlap: usize) -> Vec<Range<usize>> {
    let bounds = char_boundaries(text);
    let char_len = bounds.len() - 1;
    window_spans(char_len, size, overlap)
        .into_iter()
        .map(|span| base + bounds[span.start]..base + bounds[span.end])
        .collect()
}

/// Build a chunk that inherits the document metadata.
///
/// `offsets` are character offsets into the document text and are only
/// recorded for chunks that are literal substrings of it.
fn build_chunk(
    document: &Document,
    position: usize,
    text: String,
    offsets: Option<Range<usize>>,
) -> Chunk {
    let mut metadata = document.metadata.clone();
    metadata.insert("chunk_size".to_string(), text.chars().count().to_string());
    if let Some(offsets) = offsets {
        metadata.insert("start_char".to_string(), offsets.start.to_string());
        metadata.insert("end_char".to_string(), offsets.end.to_string());
    }
    Chunk {
        id: Chunk::make_id(&document.id, position),
        document_id: document.id.clone(),
        text,
        metadata,
        position,
    }
}

/// Turn ordered byte ranges of `document.text` into chunks with char offsets.
///
/// Range starts must be non-decreasing.
fn chunks_from_spans(document: &Document, spans: Vec<Range<usize>>) -> Vec<Chunk> {
    let text = &document.text;
    let mut byte_cursor = 0;
    let mut char_cursor = 0;

    spans
        .into_iter()
        .enumerate()
        .map(|(position, span)| {
            char_cursor += text[byte_cursor..span.start].chars().count();
            byte_cursor = span.start;
            let slice = &text[span];
            let start_char = char_cursor;
            let end_char = start_char + slice.chars().count();
            build_chunk(document, position, slice.to_string(), Some(start_char..end_char))
        })
        .collect()
}

/// Splits text into fixed-size character windows with configurable overlap.
///
/// Each chunk inherits the parent document's metadata plus `chunk_size`,
/// `start_char` and `end_char`.
///
/// # Example
///
/// ```rust
/// use ragkit_rag::{Chunker, Document, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(4, 1).unwrap();
/// let chunks = chunker.chunk(&Document::new("d", "A. B. C."));
/// let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
/// assert_eq!(texts, ["A. B", "B. C", "C."]);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of characters re-included at the start of the next chunk
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_window(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }
        let spans = hard_split(&document.text, 0, self.chunk_size, self.chunk_overlap);
        chunks_from_spans(document, spans)
    }
}

/// Splits text by a prioritized list of separators, coarse to fine.
///
/// The text is split by the first separator and consecutive parts are
/// accumulated (rejoined by that separator) while the buffer stays within
/// `chunk_size`. A part that is too large on its own is split again with the
/// remaining separators. The empty separator slices by characters using
/// `chunk_size` and `chunk_overlap`; it is also the fallback once the list is
/// exhausted, so every chunk fits within `chunk_size`.
///
/// Every chunk is a substring of the document and carries `start_char` and
/// `end_char` metadata.
///
/// # Example
///
/// ```rust
/// use ragkit_rag::{Chunker, Document, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(12, 0).unwrap();
/// let chunks = chunker.chunk(&Document::new("d", "first para\n\nsecond para"));
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[1].text, "second para");
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` using [`DEFAULT_SEPARATORS`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_window(chunk_size, chunk_overlap)?;
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replace the separator list. Order is coarse to fine.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// The separators in the order they are tried.
    pub fn separators(&self) -> &[String] {
        &self.separators
    }

    /// Split `text` (located at byte offset `base` in the document) and push
    /// the resulting byte ranges onto `out` in document order.
    fn split_into(&self, text: &str, base: usize, separators: &[String], out: &mut Vec<Range<usize>>) {
        let Some((separator, finer)) = separators.split_first() else {
            out.extend(hard_split(text, base, self.chunk_size, self.chunk_overlap));
            return;
        };
        if separator.is_empty() {
            out.extend(hard_split(text, base, self.chunk_size, self.chunk_overlap));
            return;
        }

        let separator_len = separator.chars().count();
        // (byte range, length in chars); never holds an empty range
        let mut buffer: Option<(Range<usize>, usize)> = None;
        let mut offset = base;

        for part in text.split(separator.as_str()) {
            let part_range = offset..offset + part.len();
            offset = part_range.end + separator.len();
            let part_len = part.chars().count();

            let candidate_len = match &buffer {
                Some((_, len)) => len + separator_len + part_len,
                None => part_len,
            };

            if candidate_len <= self.chunk_size {
                buffer = match buffer.take() {
                    Some((range, _)) => Some((range.start..part_range.end, candidate_len)),
                    None if part.is_empty() => None,
                    None => Some((part_range, part_len)),
                };
                continue;
            }

            if let Some((range, _)) = buffer.take() {
                out.push(range);
            }
            if part_len > self.chunk_size {
                self.split_into(part, part_range.start, finer, out);
            } else if !part.is_empty() {
                buffer = Some((part_range, part_len));
            }
        }

        if let Some((range, _)) = buffer {
            out.push(range);
        }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }
        let mut spans = Vec::new();
        self.split_into(&document.text, 0, &self.separators, &mut spans);
        chunks_from_spans(document, spans)
    }
}

/// Groups whole sentences into chunks of at most `max_chunk_size` characters.
///
/// Sentences end at whitespace following `.`, `!` or `?`. Grouped sentences
/// are joined by a single space, so chunk text is derived rather than a
/// substring and only `chunk_size` is recorded in metadata. A sentence longer
/// than the limit is emitted as its own chunk.
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    max_chunk_size: usize,
}

impl SentenceChunker {
    /// Create a new `SentenceChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `max_chunk_size` is zero.
    pub fn new(max_chunk_size: usize) -> Result<Self> {
        if max_chunk_size == 0 {
            return Err(RagError::ConfigError(
                "max_chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(Self { max_chunk_size })
    }
}

/// Split text into trimmed, non-empty sentences.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            sentences.push(&text[start..i]);
            let mut next = i + c.len_utf8();
            while let Some(&(j, w)) = chars.peek() {
                if !w.is_whitespace() {
                    break;
                }
                next = j + w.len_utf8();
                chars.next();
            }
            start = next;
            prev = None;
            continue;
        }
        prev = Some(c);
    }
    sentences.push(&text[start..]);

    sentences.into_iter().map(str::trim).filter(|s| !s.is_empty()).collect()
}

impl Chunker for SentenceChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let mut groups: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for sentence in split_sentences(&document.text) {
            let sentence_len = sentence.chars().count();
            if !current.is_empty() && current_len + 1 + sentence_len > self.max_chunk_size {
                groups.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(sentence);
            current_len += sentence_len;
        }
        if !current.is_empty() {
            groups.push(current);
        }

        groups
            .into_iter()
            .enumerate()
            .map(|(position, text)| build_chunk(document, position, text, None))
            .collect()
    }
}
