//! Prompt loading: built-in definitions with workspace YAML overrides.

use crate::types::PromptDefinition;
use docu_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Answer prompt: retrieved context in the system message, the question as the user turn.
pub const QA_PROMPT_ID: &str = "qa.default";

/// Rewrites a follow-up into a standalone question.
pub const CONDENSE_PROMPT_ID: &str = "qa.condense";

const QA_SYSTEM: &str = "Use the following pieces of context to answer the user's question. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
{{context}}";

const QA_TEMPLATE: &str = "{{question}}";

const CONDENSE_TEMPLATE: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question, in its original language.\n\n\
Chat History:\n{{chat_history}}\n\
Follow Up Input: {{question}}\n\
Standalone question:";

/// Directory holding prompt overrides for a workspace.
pub fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".docu").join("prompts")
}

/// Built-in answer prompt.
pub fn default_qa_prompt() -> PromptDefinition {
    PromptDefinition {
        id: QA_PROMPT_ID.to_string(),
        title: "Answer from document context".to_string(),
        api_version: "1.0".to_string(),
        system: Some(QA_SYSTEM.to_string()),
        template: QA_TEMPLATE.to_string(),
    }
}

/// Built-in condense prompt.
pub fn default_condense_prompt() -> PromptDefinition {
    PromptDefinition {
        id: CONDENSE_PROMPT_ID.to_string(),
        title: "Condense follow-up question".to_string(),
        api_version: "1.0".to_string(),
        system: None,
        template: CONDENSE_TEMPLATE.to_string(),
    }
}

/// Look up a built-in prompt definition.
pub fn builtin_prompt(prompt_id: &str) -> Option<PromptDefinition> {
    match prompt_id {
        QA_PROMPT_ID => Some(default_qa_prompt()),
        CONDENSE_PROMPT_ID => Some(default_condense_prompt()),
        _ => None,
    }
}

/// Load a prompt definition by ID.
///
/// A file named `<id>.yml` in `<workspace>/.docu/prompts/` takes precedence
/// over the built-in definition of the same ID.
///
/// # Example
/// ```no_run
/// use docu_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> docu_core::AppResult<()> {
/// let prompt = load_prompt(Path::new("."), "qa.default")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        return builtin_prompt(prompt_id).ok_or_else(|| {
            AppError::Prompt(format!(
                "Prompt '{}' is not built in and no file exists at {:?}",
                prompt_id, prompt_file
            ))
        });
    }

    tracing::debug!("Loading prompt override from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        tracing::warn!(
            file_id = %prompt_id,
            declared_id = %definition.id,
            "Prompt file name and declared id differ"
        );
    }

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List all available prompt IDs: built-ins plus workspace files, sorted.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let mut prompt_ids = vec![QA_PROMPT_ID.to_string(), CONDENSE_PROMPT_ID.to_string()];
    let dir = prompts_dir(workspace_path);

    if dir.exists() {
        for entry in walkdir::WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    prompt_ids.push(stem.to_string());
                }
            }
        }
    }

    prompt_ids.sort();
    prompt_ids.dedup();
    Ok(prompt_ids)
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
