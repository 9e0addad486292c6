//! Prompt system for Docu Assistant.
//!
//! - Built-in question-answering and condensing prompts
//! - YAML overrides from `<workspace>/.docu/prompts/<id>.yml`
//! - Handlebars rendering into system/user messages

pub mod builder;
pub mod loader;
pub mod types;

pub use builder::{build_prompt, QaPrompts};
pub use loader::{
    builtin_prompt, default_condense_prompt, default_qa_prompt, list_prompts, load_prompt,
    CONDENSE_PROMPT_ID, QA_PROMPT_ID,
};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
