//! Ask command handler.
//!
//! Trains on local PDFs, then asks one or more questions as a single
//! conversation, streaming each answer to stdout.

use clap::Args;
use docu_core::{config::AppConfig, AppError, AppResult};
use docu_knowledge::{load_paths, ChatMessage, Trainer};
use std::io::Write;
use std::path::PathBuf;

/// Train on local PDFs and ask questions in the terminal
#[derive(Args, Debug)]
pub struct AskCommand {
    /// PDF file or directory to train on (repeatable)
    #[arg(long = "pdf", value_name = "PATH", required = true)]
    pub pdfs: Vec<PathBuf>,

    /// Questions, asked in order within one conversation
    #[arg(value_name = "QUESTION", required = true)]
    pub questions: Vec<String>,

    /// Number of chunks retrieved per question
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Rewrite follow-up questions into standalone ones before retrieval
    #[arg(long)]
    pub condense: bool,

    /// Disable streaming
    #[arg(long)]
    pub no_stream: bool,

    /// Output the training stats and conversation as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let files = load_paths(&self.pdfs)?;
        if files.is_empty() {
            return Err(AppError::Document(format!(
                "No PDF files found in {:?}",
                self.pdfs
            )));
        }

        let trainer = Trainer::from_config(&self.effective_config(config))?;
        let outcome = trainer.train(&files).await?;
        if let Some(notice) = &outcome.notice {
            eprintln!("{}", notice);
        }
        if !self.json {
            eprintln!("{}", outcome.stats.summary());
        }

        let mut engine = outcome.engine;
        let mut history: Vec<ChatMessage> = Vec::new();

        for question in &self.questions {
            if self.json {
                history = engine.ask(question).await?;
                continue;
            }

            println!("> {}", question);
            if self.no_stream {
                history = engine.ask(question).await?;
                if let Some(answer) = history.last() {
                    println!("{}", answer.content);
                }
            } else {
                history = engine
                    .ask_streaming(question, |piece| {
                        print!("{}", piece);
                        std::io::stdout().flush().ok();
                    })
                    .await?;
                println!();
            }
            println!();
        }

        if self.json {
            let output = serde_json::json!({
                "stats": outcome.stats,
                "history": history,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Ok(())
    }

    /// Apply the command's retrieval flags on top of the loaded settings.
    fn effective_config(&self, config: &AppConfig) -> AppConfig {
        let mut config = config.clone();
        if let Some(top_k) = self.top_k {
            config.knowledge.top_k = top_k;
        }
        if self.condense {
            config.knowledge.condense_question = true;
        }
        config
    }
}
