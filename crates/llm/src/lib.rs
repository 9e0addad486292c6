//! LLM integration crate for Docu Assistant.
//!
//! Provider-agnostic access to chat-completion models through the
//! [`LlmClient`] trait.
//!
//! # Providers
//! - **OpenAI**: hosted chat completions (default)
//! - **Ollama**: local runtime
//!
//! # Example
//! ```no_run
//! use docu_llm::{create_client, LlmRequest};
//!
//! # async fn example() -> docu_core::AppResult<()> {
//! let client = create_client("ollama", None, None, 120)?;
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::{LlmMessage, MessageRole, ProviderType};
