//! Prompt builder: renders definitions into system/user messages.

use crate::loader::{
    default_condense_prompt, default_qa_prompt, load_prompt, CONDENSE_PROMPT_ID, QA_PROMPT_ID,
};
use crate::types::{BuiltPrompt, PromptDefinition};
use docu_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;
use std::path::Path;

/// Build a prompt from a definition and input variables.
///
/// Both the system and the user template are rendered with the same
/// variables. Rendering is plain text: no HTML escaping is applied.
///
/// # Example
/// ```no_run
/// use docu_prompt::{build_prompt, default_qa_prompt};
/// use std::collections::HashMap;
///
/// # fn example() -> docu_core::AppResult<()> {
/// let def = default_qa_prompt();
/// let mut vars = HashMap::new();
/// vars.insert("context".to_string(), "Rust is a language.".to_string());
/// vars.insert("question".to_string(), "What is Rust?".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?;
    let user = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(system, user, definition.id.clone(), variables))
}

fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

/// The pair of prompts a conversation engine needs.
#[derive(Debug, Clone, PartialEq)]
pub struct QaPrompts {
    pub answer: PromptDefinition,
    pub condense: PromptDefinition,
}

impl QaPrompts {
    /// Load both prompts, honouring workspace overrides.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        Ok(Self {
            answer: load_prompt(workspace_path, QA_PROMPT_ID)?,
            condense: load_prompt(workspace_path, CONDENSE_PROMPT_ID)?,
        })
    }

    /// Render the answer prompt for retrieved context and a question.
    pub fn build_answer(&self, context: &str, question: &str) -> AppResult<BuiltPrompt> {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), context.to_string());
        vars.insert("question".to_string(), question.to_string());
        build_prompt(&self.answer, vars)
    }

    /// Render the condense prompt for a transcript and a follow-up question.
    pub fn build_condense(&self, chat_history: &str, question: &str) -> AppResult<BuiltPrompt> {
        let mut vars = HashMap::new();
        vars.insert("chat_history".to_string(), chat_history.to_string());
        vars.insert("question".to_string(), question.to_string());
        build_prompt(&self.condense, vars)
    }
}

impl Default for QaPrompts {
    fn default() -> Self {
        Self {
            answer: default_qa_prompt(),
            condense: default_condense_prompt(),
        }
    }
}
