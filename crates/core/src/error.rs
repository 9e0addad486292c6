//! Error types for Docu Assistant.
//!
//! A single error enum covers every failure category in the workspace:
//! configuration, I/O, model and embedding providers, PDF extraction,
//! retrieval, prompts and the session precondition.

use thiserror::Error;

/// Unified error type for Docu Assistant.
///
/// All library functions return `Result<T, AppError>`. Recoverable failures
/// are represented and propagated, never turned into panics.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Chat-completion provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Unreadable or corrupt PDF documents
    #[error("Document error: {0}")]
    Document(String),

    /// Chunking, indexing and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// A question was asked before any documents were trained
    #[error("No documents have been trained yet. Upload PDFs and press Train first.")]
    NotTrained,

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_trained_message() {
        let err = AppError::NotTrained;
        assert!(err.to_string().contains("Train"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::Io(_)));
    }
}
