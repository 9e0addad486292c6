//! Conversation memory buffer.

use crate::types::{ChatMessage, Role};
use docu_llm::LlmMessage;

/// Ordered user/bot turns of one conversation.
///
/// Turns are only ever added in complete question/answer pairs, so the
/// buffer always alternates user, bot, user, bot, starting with user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationMemory {
    messages: Vec<ChatMessage>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed round.
    pub fn push_round(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.messages.push(ChatMessage::user(question));
        self.messages.push(ChatMessage::bot(answer));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Prior turns as chat-completion messages.
    pub fn to_llm_messages(&self) -> Vec<LlmMessage> {
        self.messages
            .iter()
            .map(|m| match m.role {
                Role::User => LlmMessage::user(m.content.clone()),
                Role::Bot => LlmMessage::assistant(m.content.clone()),
            })
            .collect()
    }

    /// Plain-text transcript, one "Human:" or "Assistant:" line per turn.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| match m.role {
                Role::User => format!("Human: {}", m.content),
                Role::Bot => format!("Assistant: {}", m.content),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
