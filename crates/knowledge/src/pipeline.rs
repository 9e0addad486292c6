//! The Train action: uploaded PDFs in, ready conversation engine out.

use crate::chunker::{chunk_text, ChunkConfig};
use crate::conversation::{ConversationEngine, EngineOptions};
use crate::embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
use crate::loader::{extract_text, UploadedFile};
use crate::memory_index::MemoryIndex;
use crate::types::TrainStats;
use docu_core::{AppConfig, AppResult, KnowledgeSettings};
use docu_llm::{create_client, LlmClient};
use docu_prompt::QaPrompts;
use std::sync::Arc;
use std::time::Instant;

/// Result of a successful Train action.
#[derive(Debug)]
pub struct TrainOutcome {
    pub engine: ConversationEngine,
    pub stats: TrainStats,
    /// User-visible notice, e.g. when no files were selected
    pub notice: Option<String>,
}

/// Shared collaborators for building conversation engines.
///
/// Cheap to clone; every engine it produces shares the same clients.
#[derive(Clone)]
pub struct Trainer {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
    model: String,
    settings: KnowledgeSettings,
    prompts: QaPrompts,
}

impl std::fmt::Debug for Trainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trainer")
            .field("embedder", &self.embedder.provider_name())
            .field("llm", &self.llm.provider_name())
            .field("model", &self.model)
            .field("settings", &self.settings)
            .finish()
    }
}

impl Trainer {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        settings: KnowledgeSettings,
        prompts: QaPrompts,
    ) -> Self {
        Self {
            embedder,
            llm,
            model: model.into(),
            settings,
            prompts,
        }
    }

    /// Build the clients and prompts named by the application configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let llm_key = config.resolve_api_key(&config.provider);
        let llm = create_client(
            &config.provider,
            config.provider_endpoint(&config.provider).as_deref(),
            llm_key.as_deref(),
            config.provider_timeout(&config.provider),
        )?;

        let embedding_config = EmbeddingConfig::from_app_config(config);
        let embedding_key = config.resolve_api_key(&embedding_config.provider);
        let embedder = create_provider(&embedding_config, embedding_key.as_deref())?;

        let prompts = QaPrompts::load(&config.workspace)?;

        tracing::info!(
            provider = %config.provider,
            model = %config.model,
            embedding_provider = %embedder.provider_name(),
            embedding_model = %embedder.model_name(),
            "Trainer ready"
        );

        Ok(Self::new(
            embedder,
            llm,
            config.model.clone(),
            config.knowledge.clone(),
            prompts,
        ))
    }

    pub fn settings(&self) -> &KnowledgeSettings {
        &self.settings
    }

    /// Extract, chunk, embed and index the files, then wrap the index in a
    /// fresh conversation engine.
    ///
    /// Any failure aborts the whole action; nothing partial is returned.
    pub async fn train(&self, files: &[UploadedFile]) -> AppResult<TrainOutcome> {
        let start = Instant::now();
        let chunk_config = ChunkConfig::from_settings(&self.settings)?;

        let loaded = extract_text(files)?;
        let chunks = chunk_text(&loaded.text, &chunk_config);

        let embeddings = if chunks.is_empty() {
            Vec::new()
        } else {
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            self.embedder.embed_batch(&texts).await?
        };
        let embedding_dim = embeddings.first().map(Vec::len).unwrap_or(0);

        let stats = TrainStats {
            files: loaded.files,
            pages: loaded.pages,
            characters: loaded.text.chars().count(),
            chunks: chunks.len(),
            embedding_dim,
            duration_secs: 0.0,
        };

        let index = MemoryIndex::build(chunks, embeddings)?;
        let engine = ConversationEngine::new(
            Arc::new(index),
            self.embedder.clone(),
            self.llm.clone(),
            self.model.clone(),
            self.prompts.clone(),
            EngineOptions::from_settings(&self.settings),
        );

        let stats = TrainStats {
            duration_secs: start.elapsed().as_secs_f64(),
            ..stats
        };

        tracing::info!(
            files = stats.files,
            pages = stats.pages,
            chunks = stats.chunks,
            embedding_dim = stats.embedding_dim,
            "Training completed in {:.2}s",
            stats.duration_secs
        );

        Ok(TrainOutcome {
            engine,
            stats,
            notice: loaded.notice,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::loader::test_pdf::pdf_with_pages;
    use crate::loader::NO_FILES_NOTICE;
    use docu_core::AppError;
    use docu_llm::OllamaClient;

    #[derive(Debug)]
    struct FailingEmbedder;

    #[async_trait::async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn provider_name(&self) -> &str {
            "failing"
        }

        fn model_name(&self) -> &str {
            "none"
        }

        fn dimensions(&self) -> usize {
            8
        }

        async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Err(AppError::Embedding("quota exceeded".to_string()))
        }
    }

    fn trainer_with(embedder: Arc<dyn EmbeddingProvider>, settings: KnowledgeSettings) -> Trainer {
        // The chat client is never called while training
        Trainer::new(
            embedder,
            Arc::new(OllamaClient::new()),
            "llama3.2",
            settings,
            QaPrompts::default(),
        )
    }

    fn small_chunks() -> KnowledgeSettings {
        KnowledgeSettings {
            chunk_size: 40,
            chunk_overlap: 10,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_train_indexes_all_pages() {
        let trainer = trainer_with(Arc::new(TrigramProvider::new(128)), small_chunks());
        let files = vec![
            UploadedFile::new("one.pdf", pdf_with_pages(&["Photosynthesis converts light", "into chemical energy"])),
            UploadedFile::new("two.pdf", pdf_with_pages(&["Invoices list shipping fees"])),
        ];

        let outcome = trainer.train(&files).await.unwrap();
        assert_eq!(outcome.stats.files, 2);
        assert_eq!(outcome.stats.pages, 3);
        assert!(outcome.stats.chunks >= 2);
        assert_eq!(outcome.stats.embedding_dim, 128);
        assert_eq!(outcome.engine.chunk_count(), outcome.stats.chunks);
        assert!(outcome.engine.history().is_empty());
        assert!(outcome.notice.is_none());
    }

    #[tokio::test]
    async fn test_no_files_trains_empty_index() {
        let trainer = trainer_with(Arc::new(FailingEmbedder), KnowledgeSettings::default());

        // Nothing to embed, so the failing provider is never reached
        let outcome = trainer.train(&[]).await.unwrap();
        assert_eq!(outcome.stats.chunks, 0);
        assert_eq!(outcome.stats.embedding_dim, 0);
        assert_eq!(outcome.engine.chunk_count(), 0);
        assert_eq!(outcome.notice.as_deref(), Some(NO_FILES_NOTICE));
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts() {
        let trainer = trainer_with(Arc::new(FailingEmbedder), KnowledgeSettings::default());
        let files = vec![UploadedFile::new("a.pdf", pdf_with_pages(&["some text"]))];

        let result = trainer.train(&files).await;
        assert!(matches!(result, Err(AppError::Embedding(_))));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_aborts() {
        let trainer = trainer_with(Arc::new(TrigramProvider::new(64)), KnowledgeSettings::default());
        let files = vec![UploadedFile::new("bad.pdf", b"%PDF-garbage".to_vec())];

        let result = trainer.train(&files).await;
        assert!(matches!(result, Err(AppError::Document(_))));
    }

    #[tokio::test]
    async fn test_invalid_chunk_settings_rejected() {
        let settings = KnowledgeSettings {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        let trainer = trainer_with(Arc::new(TrigramProvider::new(64)), settings);

        let result = trainer.train(&[]).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_from_config_with_local_providers() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig {
            workspace: dir.path().to_path_buf(),
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            embedding_provider: "trigram".to_string(),
            ..Default::default()
        };

        let trainer = Trainer::from_config(&config).unwrap();
        assert_eq!(trainer.model, "llama3.2");
        assert_eq!(trainer.embedder.provider_name(), "trigram");
        assert_eq!(trainer.llm.provider_name(), "ollama");
    }
}
