//! In-memory brute-force vector index.

use crate::types::{ScoredChunk, TextChunk};
use crate::vector_index::{cosine_similarity, VectorIndex};
use docu_core::{AppError, AppResult};

/// Chunks and their embeddings held in memory, searched exhaustively.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    entries: Vec<(TextChunk, Vec<f32>)>,
    dimensions: Option<usize>,
}

impl MemoryIndex {
    /// Build an index from chunks and their embeddings, paired by position.
    ///
    /// Fails when the counts differ or the vectors are not all the same
    /// non-zero length.
    pub fn build(chunks: Vec<TextChunk>, embeddings: Vec<Vec<f32>>) -> AppResult<Self> {
        if chunks.len() != embeddings.len() {
            return Err(AppError::Knowledge(format!(
                "Got {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimensions = embeddings.first().map(Vec::len);
        if dimensions == Some(0) {
            return Err(AppError::Knowledge("Embeddings cannot be empty".to_string()));
        }
        if let Some(dim) = dimensions {
            if let Some(bad) = embeddings.iter().position(|e| e.len() != dim) {
                return Err(AppError::Knowledge(format!(
                    "Embedding {} has {} dimensions, expected {}",
                    bad,
                    embeddings[bad].len(),
                    dim
                )));
            }
        }

        tracing::debug!(chunks = chunks.len(), ?dimensions, "Built in-memory index");

        Ok(Self {
            entries: chunks.into_iter().zip(embeddings).collect(),
            dimensions,
        })
    }

    /// Indexed chunks in their original order.
    pub fn chunks(&self) -> impl Iterator<Item = &TextChunk> {
        self.entries.iter().map(|(chunk, _)| chunk)
    }
}

impl VectorIndex for MemoryIndex {
    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<ScoredChunk>> {
        let Some(dim) = self.dimensions else {
            return Ok(Vec::new());
        };

        if query_embedding.len() != dim {
            return Err(AppError::Knowledge(format!(
                "Query has {} dimensions, index has {}",
                query_embedding.len(),
                dim
            )));
        }

        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|(chunk, embedding)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(query_embedding, embedding),
            })
            .collect();

        // Stable sort keeps document order among equal scores
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);

        Ok(scored)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }
}
