//! Conversational retrieval chain.
//!
//! Each question is embedded, the closest chunks are retrieved from the
//! index, and the model answers from that context with the prior turns of
//! the conversation in view.

use crate::conversation::memory::ConversationMemory;
use crate::embeddings::EmbeddingProvider;
use crate::types::{ChatMessage, ScoredChunk};
use crate::vector_index::VectorIndex;
use docu_core::{AppError, AppResult, KnowledgeSettings};
use docu_llm::{LlmClient, LlmMessage, LlmRequest};
use docu_prompt::QaPrompts;
use futures::StreamExt;
use std::sync::Arc;

/// Retrieval and generation knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Chunks retrieved per question
    pub top_k: usize,

    /// Rewrite follow-ups into standalone questions before retrieval
    pub condense_question: bool,

    /// Sampling temperature passed to the model
    pub temperature: Option<f32>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            top_k: 4,
            condense_question: false,
            temperature: None,
        }
    }
}

impl EngineOptions {
    pub fn from_settings(settings: &KnowledgeSettings) -> Self {
        Self {
            top_k: settings.top_k,
            condense_question: settings.condense_question,
            temperature: None,
        }
    }
}

/// Index, memory and chat model for one trained document set.
pub struct ConversationEngine {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
    model: String,
    prompts: QaPrompts,
    options: EngineOptions,
    memory: ConversationMemory,
}

impl std::fmt::Debug for ConversationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationEngine")
            .field("chunks", &self.index.len())
            .field("embedder", &self.embedder.provider_name())
            .field("llm", &self.llm.provider_name())
            .field("model", &self.model)
            .field("options", &self.options)
            .field("turns", &self.memory.len())
            .finish()
    }
}

impl ConversationEngine {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompts: QaPrompts,
        options: EngineOptions,
    ) -> Self {
        Self {
            index,
            embedder,
            llm,
            model: model.into(),
            prompts,
            options,
            memory: ConversationMemory::new(),
        }
    }

    /// Answer a question and return the full updated history.
    ///
    /// Memory is only updated after the model has answered; on any error it
    /// is left exactly as it was.
    pub async fn ask(&mut self, question: &str) -> AppResult<Vec<ChatMessage>> {
        let request = self.prepare(question).await?;
        let response = self.llm.complete(&request).await?;

        tracing::info!(
            turns = self.memory.len() + 2,
            completion_tokens = response.usage.completion_tokens,
            "Answered question"
        );

        self.memory.push_round(question, response.content);
        Ok(self.history().to_vec())
    }

    /// Like [`ask`](Self::ask), but hands each piece of the answer to
    /// `on_token` as it arrives.
    pub async fn ask_streaming<F>(&mut self, question: &str, mut on_token: F) -> AppResult<Vec<ChatMessage>>
    where
        F: FnMut(&str) + Send,
    {
        let request = self.prepare(question).await?.with_streaming();
        let mut stream = self.llm.stream(&request).await?;

        let mut answer = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            on_token(&chunk.content);
            answer.push_str(&chunk.content);
            if chunk.done {
                break;
            }
        }

        self.memory.push_round(question, answer);
        Ok(self.history().to_vec())
    }

    /// Conversation so far.
    pub fn history(&self) -> &[ChatMessage] {
        self.memory.messages()
    }

    /// Forget the conversation, keep the index.
    pub fn reset_memory(&mut self) {
        self.memory.clear();
    }

    /// Number of indexed chunks.
    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    /// Build the chat request for a question: retrieve, then render the prompt.
    async fn prepare(&self, question: &str) -> AppResult<LlmRequest> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Knowledge("Question cannot be empty".to_string()));
        }

        let search_query = if self.options.condense_question && !self.memory.is_empty() {
            self.condense(question).await?
        } else {
            question.to_string()
        };

        let query_embedding = self.embedder.embed(&search_query).await?;
        let hits = self.index.search(&query_embedding, self.options.top_k)?;

        tracing::debug!(
            retrieved = hits.len(),
            top_score = hits.first().map(|h| h.score).unwrap_or(0.0),
            "Retrieved context"
        );

        let built = self.prompts.build_answer(&build_context(&hits), question)?;

        let mut messages = Vec::with_capacity(self.memory.len() + 2);
        if let Some(system) = built.system {
            messages.push(LlmMessage::system(system));
        }
        messages.extend(self.memory.to_llm_messages());
        messages.push(LlmMessage::user(built.user));

        let mut request = LlmRequest::from_messages(messages, &self.model);
        if let Some(temperature) = self.options.temperature {
            request = request.with_temperature(temperature);
        }
        Ok(request)
    }

    /// Rewrite a follow-up into a standalone question using the transcript.
    async fn condense(&self, question: &str) -> AppResult<String> {
        let built = self
            .prompts
            .build_condense(&self.memory.transcript(), question)?;

        let mut messages = Vec::new();
        if let Some(system) = built.system {
            messages.push(LlmMessage::system(system));
        }
        messages.push(LlmMessage::user(built.user));

        let request = LlmRequest::from_messages(messages, &self.model).with_temperature(0.0);
        let response = self.llm.complete(&request).await?;
        let standalone = response.content.trim().to_string();

        tracing::debug!(standalone = %standalone, "Condensed follow-up question");

        if standalone.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(standalone)
        }
    }
}

/// Join retrieved chunks into the context block of the answer prompt.
fn build_context(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("[Document {}]\n{}", i + 1, hit.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::memory_index::MemoryIndex;
    use crate::types::{Role, TextChunk};
    use docu_core::AppResult;
    use docu_llm::{LlmResponse, LlmStream, LlmStreamChunk, LlmUsage, MessageRole};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Replies "answer N" and records every request.
    #[derive(Default)]
    struct RecordingLlm {
        requests: Mutex<Vec<LlmRequest>>,
        fail: AtomicBool,
    }

    impl RecordingLlm {
        fn requests(&self) -> Vec<LlmRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn record(&self, request: &LlmRequest) -> AppResult<String> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::Llm("model unavailable".to_string()));
            }
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            Ok(format!("answer {}", requests.len()))
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for RecordingLlm {
        fn provider_name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            let content = self.record(request)?;
            Ok(LlmResponse {
                content,
                model: request.model.clone(),
                usage: LlmUsage::new(1, 1),
                done: true,
            })
        }

        async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
            let content = self.record(request)?;
            let pieces: Vec<AppResult<LlmStreamChunk>> = content
                .split_inclusive(' ')
                .map(|piece| {
                    Ok(LlmStreamChunk {
                        content: piece.to_string(),
                        model: request.model.clone(),
                        done: false,
                        usage: None,
                    })
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(pieces)))
        }
    }

    async fn engine_with(texts: &[&str], llm: Arc<RecordingLlm>, options: EngineOptions) -> ConversationEngine {
        let embedder = Arc::new(TrigramProvider::new(256));
        let chunks: Vec<TextChunk> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| TextChunk {
                position: i as u32,
                text: t.to_string(),
                start: 0,
                end: t.chars().count(),
            })
            .collect();
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let embeddings = embedder.embed_batch(&owned).await.unwrap();
        let index = MemoryIndex::build(chunks, embeddings).unwrap();

        ConversationEngine::new(
            Arc::new(index),
            embedder,
            llm,
            "test-model",
            QaPrompts::default(),
            options,
        )
    }

    #[tokio::test]
    async fn test_history_alternates_after_rounds() {
        let llm = Arc::new(RecordingLlm::default());
        let mut engine = engine_with(&["Xylophones are percussion instruments."], llm, EngineOptions::default()).await;

        let mut history = Vec::new();
        for i in 0..3 {
            history = engine.ask(&format!("question {}", i)).await.unwrap();
        }

        assert_eq!(history.len(), 6);
        for (i, message) in history.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Bot };
            assert_eq!(message.role, expected);
        }
    }

    #[tokio::test]
    async fn test_follow_up_keeps_question_positions() {
        let llm = Arc::new(RecordingLlm::default());
        let mut engine = engine_with(&["X is a letter.", "Y follows X."], llm.clone(), EngineOptions::default()).await;

        engine.ask("What is X?").await.unwrap();
        let history = engine.ask("And Y?").await.unwrap();

        assert_eq!(history.len(), 4);
        assert_eq!(history[0], ChatMessage::user("What is X?"));
        assert_eq!(history[1], ChatMessage::bot("answer 1"));
        assert_eq!(history[2], ChatMessage::user("And Y?"));
        assert_eq!(history[3], ChatMessage::bot("answer 2"));

        // One model call per question by default
        assert_eq!(llm.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_request_carries_context_and_prior_turns() {
        let llm = Arc::new(RecordingLlm::default());
        let mut engine = engine_with(
            &["Photosynthesis converts light into chemical energy.", "Invoices list shipping fees."],
            llm.clone(),
            EngineOptions {
                top_k: 1,
                ..Default::default()
            },
        )
        .await;

        engine.ask("Explain photosynthesis").await.unwrap();
        engine.ask("Tell me more about photosynthesis").await.unwrap();

        let second = &llm.requests()[1];
        let roles: Vec<MessageRole> = second.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::System, MessageRole::User, MessageRole::Assistant, MessageRole::User]
        );

        let system = second.system().unwrap();
        assert!(system.contains("Photosynthesis converts light"));
        assert!(!system.contains("Invoices"));
        assert_eq!(second.messages[3].content, "Tell me more about photosynthesis");
        assert_eq!(second.model, "test-model");
    }

    #[tokio::test]
    async fn test_model_failure_leaves_memory_unchanged() {
        let llm = Arc::new(RecordingLlm::default());
        let mut engine = engine_with(&["text"], llm.clone(), EngineOptions::default()).await;

        engine.ask("first").await.unwrap();
        llm.fail.store(true, Ordering::SeqCst);

        let result = engine.ask("second").await;
        assert!(matches!(result, Err(AppError::Llm(_))));
        assert_eq!(engine.history().len(), 2);
    }

    #[tokio::test]
    async fn test_condense_adds_call_only_with_history() {
        let llm = Arc::new(RecordingLlm::default());
        let options = EngineOptions {
            condense_question: true,
            ..Default::default()
        };
        let mut engine = engine_with(&["X is a letter."], llm.clone(), options).await;

        engine.ask("What is X?").await.unwrap();
        assert_eq!(llm.requests().len(), 1);

        let history = engine.ask("And Y?").await.unwrap();
        let requests = llm.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[1].messages[0].content.contains("Follow Up Input: And Y?"));
        assert_eq!(history[2].content, "And Y?");
        assert_eq!(history[3].content, "answer 3");
    }

    #[tokio::test]
    async fn test_streaming_collects_answer() {
        let llm = Arc::new(RecordingLlm::default());
        let mut engine = engine_with(&["text"], llm, EngineOptions::default()).await;

        let mut streamed = String::new();
        let history = engine
            .ask_streaming("hello?", |piece| streamed.push_str(piece))
            .await
            .unwrap();

        assert_eq!(streamed, "answer 1");
        assert_eq!(history[1].content, "answer 1");
    }

    #[tokio::test]
    async fn test_reset_memory_keeps_index() {
        let llm = Arc::new(RecordingLlm::default());
        let mut engine = engine_with(&["a chunk", "another chunk"], llm, EngineOptions::default()).await;

        engine.ask("question").await.unwrap();
        engine.reset_memory();

        assert!(engine.history().is_empty());
        assert_eq!(engine.chunk_count(), 2);
        assert_eq!(engine.ask("again").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let llm = Arc::new(RecordingLlm::default());
        let mut engine = engine_with(&["text"], llm.clone(), EngineOptions::default()).await;

        assert!(engine.ask("   ").await.is_err());
        assert!(llm.requests().is_empty());
    }

    #[test]
    fn test_build_context_numbers_documents() {
        let hit = |text: &str| ScoredChunk {
            chunk: TextChunk {
                position: 0,
                text: text.to_string(),
                start: 0,
                end: 0,
            },
            score: 1.0,
        };
        let context = build_context(&[hit("one"), hit("two")]);
        assert_eq!(context, "[Document 1]\none\n\n---\n\n[Document 2]\ntwo");
    }
}
