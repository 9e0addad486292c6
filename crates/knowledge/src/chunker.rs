//! Text chunking with configurable size and overlap.
//!
//! Lengths and offsets are counted in Unicode scalar values, so a chunk
//! boundary never falls inside a character.

use crate::types::TextChunk;
use docu_core::{AppError, AppResult, KnowledgeSettings};
use std::collections::VecDeque;

/// Chunking parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
    chunk_overlap: usize,
    separator: Option<String>,
}

impl ChunkConfig {
    /// Validate and build a configuration.
    ///
    /// Requires `chunk_size > 0`, `chunk_overlap < chunk_size` and, when
    /// given, a non-empty separator.
    pub fn new(chunk_size: usize, chunk_overlap: usize, separator: Option<String>) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config("chunk size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                chunk_overlap, chunk_size
            )));
        }
        if separator.as_deref() == Some("") {
            return Err(AppError::Config("chunk separator cannot be empty".to_string()));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separator,
        })
    }

    pub fn from_settings(settings: &KnowledgeSettings) -> AppResult<Self> {
        Self::new(
            settings.chunk_size,
            settings.chunk_overlap,
            settings.separator.clone(),
        )
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn separator(&self) -> Option<&str> {
        self.separator.as_deref()
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separator: None,
        }
    }
}

/// Split text into ordered, overlapping chunks.
///
/// Without a separator the text is cut into fixed windows: every chunk but
/// the last holds exactly `chunk_size` characters and consecutive chunks
/// share exactly `chunk_overlap` characters.
///
/// With a separator the text is split on it and the pieces are greedily
/// merged up to `chunk_size`, carrying up to `chunk_overlap` characters of
/// trailing pieces into the next chunk. Pieces longer than `chunk_size` are
/// windowed.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<TextChunk> {
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let spans = match config.separator() {
        None => window_spans(0, chars.len(), config),
        Some(sep) => separator_spans(text, sep, config),
    };

    let chunks: Vec<TextChunk> = spans
        .into_iter()
        .enumerate()
        .map(|(position, (start, end))| TextChunk {
            position: position as u32,
            text: chars[start..end].iter().collect(),
            start,
            end,
        })
        .collect();

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {}, separator: {:?})",
        chunks.len(),
        config.chunk_size,
        config.chunk_overlap,
        config.separator
    );

    chunks
}

/// Fixed windows over the character range `[from, to)`.
fn window_spans(from: usize, to: usize, config: &ChunkConfig) -> Vec<(usize, usize)> {
    let step = config.chunk_size - config.chunk_overlap;
    let mut spans = Vec::new();
    let mut start = from;

    while start < to {
        let end = (start + config.chunk_size).min(to);
        spans.push((start, end));
        if end == to {
            break;
        }
        start += step;
    }

    spans
}

/// Greedy merge of separator-delimited pieces.
fn separator_spans(text: &str, separator: &str, config: &ChunkConfig) -> Vec<(usize, usize)> {
    let sep_len = separator.chars().count();

    // (start, len) of every piece, in characters
    let mut pieces = Vec::new();
    let mut offset = 0;
    for piece in text.split(separator) {
        let len = piece.chars().count();
        pieces.push((offset, len));
        offset += len + sep_len;
    }

    let mut spans = Vec::new();
    let mut current: VecDeque<(usize, usize)> = VecDeque::new();
    let mut total = 0usize;

    let joined_len = |current: &VecDeque<(usize, usize)>| -> usize {
        let sum: usize = current.iter().map(|(_, len)| len).sum();
        sum + sep_len * current.len().saturating_sub(1)
    };
    let span_of = |current: &VecDeque<(usize, usize)>| -> Option<(usize, usize)> {
        let first = current.front()?;
        let last = current.back()?;
        Some((first.0, last.0 + last.1))
    };

    for (start, len) in pieces {
        if len > config.chunk_size {
            if let Some(span) = span_of(&current) {
                spans.push(span);
            }
            current.clear();
            total = 0;
            spans.extend(window_spans(start, start + len, config));
            continue;
        }

        let joiner = if current.is_empty() { 0 } else { sep_len };
        if total + joiner + len > config.chunk_size && !current.is_empty() {
            if let Some(span) = span_of(&current) {
                spans.push(span);
            }

            // Keep only as much tail as fits the overlap and leaves room for this piece
            while !current.is_empty()
                && (total > config.chunk_overlap
                    || total + sep_len + len > config.chunk_size)
            {
                current.pop_front();
                total = joined_len(&current);
            }
        }

        current.push_back((start, len));
        total = joined_len(&current);
    }

    if let Some(span) = span_of(&current) {
        spans.push(span);
    }

    // Empty pieces come from adjacent separators
    spans.retain(|(start, end)| start < end);
    spans
}
