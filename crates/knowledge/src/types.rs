//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            content: content.into(),
        }
    }
}

/// A contiguous slice of the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Position in the chunk sequence, starting at 0
    pub position: u32,

    /// Chunk content
    pub text: String,

    /// Start offset into the raw text, in characters
    pub start: usize,

    /// End offset (exclusive) into the raw text, in characters
    pub end: usize,
}

impl TextChunk {
    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// A chunk returned by similarity search with its cosine score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: TextChunk,
    pub score: f32,
}

/// Statistics from a Train action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainStats {
    /// Number of PDF files read
    pub files: usize,

    /// Number of pages read across all files
    pub pages: usize,

    /// Characters of raw text
    pub characters: usize,

    /// Number of chunks indexed
    pub chunks: usize,

    /// Embedding vector dimension (0 when nothing was indexed)
    pub embedding_dim: usize,

    /// Wall-clock duration in seconds
    pub duration_secs: f64,
}

impl TrainStats {
    /// One-line summary shown after training.
    pub fn summary(&self) -> String {
        format!(
            "Trained on {} file(s), {} page(s): {} chunk(s) indexed in {:.2}s",
            self.files, self.pages, self.chunks, self.duration_secs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::bot("hi")).unwrap();
        assert_eq!(json, r#"{"role":"bot","content":"hi"}"#);
    }

    #[test]
    fn test_stats_summary() {
        let stats = TrainStats {
            files: 2,
            pages: 5,
            characters: 4200,
            chunks: 6,
            embedding_dim: 384,
            duration_secs: 1.5,
        };
        assert_eq!(
            stats.summary(),
            "Trained on 2 file(s), 5 page(s): 6 chunk(s) indexed in 1.50s"
        );
    }
}
