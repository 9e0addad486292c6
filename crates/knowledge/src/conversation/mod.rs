//! Retrieval-augmented conversation: memory buffer and engine.

pub mod engine;
pub mod memory;

pub use engine::{ConversationEngine, EngineOptions};
pub use memory::ConversationMemory;
