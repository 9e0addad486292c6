//! Document knowledge for Docu Assistant.
//!
//! Turns uploaded PDFs into an in-memory vector index and answers questions
//! about them through a conversational retrieval chain:
//!
//! 1. [`loader`] extracts page text from the PDFs
//! 2. [`chunker`] cuts the text into overlapping chunks
//! 3. [`embeddings`] embeds every chunk
//! 4. [`memory_index`] holds the vectors for cosine top-k search
//! 5. [`conversation`] retrieves context and asks the chat model
//!
//! [`pipeline::Trainer`] runs steps 1 to 4 and hands back a ready
//! [`ConversationEngine`].

pub mod chunker;
pub mod conversation;
pub mod embeddings;
pub mod loader;
pub mod memory_index;
pub mod pipeline;
pub mod types;
pub mod vector_index;

pub use chunker::{chunk_text, ChunkConfig};
pub use conversation::{ConversationEngine, ConversationMemory, EngineOptions};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use loader::{extract_text, load_paths, LoadedText, UploadedFile, NO_FILES_NOTICE};
pub use memory_index::MemoryIndex;
pub use pipeline::{TrainOutcome, Trainer};
pub use types::{ChatMessage, Role, ScoredChunk, TextChunk, TrainStats};
pub use vector_index::VectorIndex;
