//! HTML rendering of the chat page.
//!
//! Templates are compiled into the binary and rendered with Handlebars'
//! default HTML escaping, so user questions and model answers are always
//! inserted as text.

use axum::http::StatusCode;
use docu_core::{AppError, AppResult};
use docu_knowledge::ChatMessage;
use handlebars::Handlebars;
use serde::Serialize;
use std::sync::OnceLock;

const PAGE_TEMPLATE: &str = include_str!("templates/page.hbs");
const USER_MESSAGE_TEMPLATE: &str = include_str!("templates/user_message.hbs");
const BOT_MESSAGE_TEMPLATE: &str = include_str!("templates/bot_message.hbs");
const ERROR_TEMPLATE: &str = include_str!("templates/error.hbs");

/// Shown in place of a conversation before the first answer.
const GREETING: [&str; 2] = ["Hello User", "Hello Bot"];

/// Severity of a page notice; doubles as its CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

/// A one-line message displayed above the question form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

#[derive(Serialize)]
struct MessageView<'a> {
    is_user: bool,
    text: &'a str,
}

#[derive(Serialize)]
struct PageView<'a> {
    messages: Vec<MessageView<'a>>,
    notice: Option<&'a Notice>,
    trained: bool,
    chunks: usize,
}

/// Compiled page templates.
#[derive(Debug)]
pub struct PageRenderer {
    registry: Handlebars<'static>,
}

impl PageRenderer {
    pub fn new() -> AppResult<Self> {
        let mut registry = Handlebars::new();

        registry
            .register_template_string("page", PAGE_TEMPLATE)
            .map_err(|e| AppError::Other(format!("Failed to register page template: {}", e)))?;
        registry
            .register_partial("user_message", USER_MESSAGE_TEMPLATE)
            .map_err(|e| AppError::Other(format!("Failed to register user template: {}", e)))?;
        registry
            .register_partial("bot_message", BOT_MESSAGE_TEMPLATE)
            .map_err(|e| AppError::Other(format!("Failed to register bot template: {}", e)))?;
        registry
            .register_template_string("error", ERROR_TEMPLATE)
            .map_err(|e| AppError::Other(format!("Failed to register error template: {}", e)))?;

        Ok(Self { registry })
    }

    /// The process-wide renderer, compiled on first use.
    pub fn shared() -> AppResult<&'static PageRenderer> {
        static SHARED: OnceLock<Result<PageRenderer, String>> = OnceLock::new();

        SHARED
            .get_or_init(|| PageRenderer::new().map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| AppError::Other(e.clone()))
    }

    /// Render the chat page.
    ///
    /// Entries at even positions of `history` use the user template and odd
    /// ones the bot template. With no history the greeting pair is shown.
    /// `indexed_chunks` is `Some` once the session has been trained.
    pub fn render_page(
        &self,
        history: Option<&[ChatMessage]>,
        indexed_chunks: Option<usize>,
        notice: Option<&Notice>,
    ) -> AppResult<String> {
        let messages = match history {
            Some(history) if !history.is_empty() => history
                .iter()
                .enumerate()
                .map(|(i, message)| MessageView {
                    is_user: i % 2 == 0,
                    text: &message.content,
                })
                .collect(),
            _ => GREETING
                .iter()
                .enumerate()
                .map(|(i, text)| MessageView {
                    is_user: i % 2 == 0,
                    text: *text,
                })
                .collect(),
        };

        let view = PageView {
            messages,
            notice,
            trained: indexed_chunks.is_some(),
            chunks: indexed_chunks.unwrap_or(0),
        };

        self.registry
            .render("page", &view)
            .map_err(|e| AppError::Other(format!("Failed to render page: {}", e)))
    }
}

#[derive(Serialize)]
struct ErrorView<'a> {
    status: String,
    message: &'a str,
}

impl PageRenderer {
    /// Render the standalone error page for a failed request.
    pub fn render_error(&self, status: StatusCode, message: &str) -> AppResult<String> {
        let view = ErrorView {
            status: status.to_string(),
            message,
        };

        self.registry
            .render("error", &view)
            .map_err(|e| AppError::Other(format!("Failed to render error page: {}", e)))
    }
}

/// Standalone error page for a failed request, from the shared renderer.
pub fn error_page(status: StatusCode, message: &str) -> String {
    PageRenderer::shared()
        .and_then(|renderer| renderer.render_error(status, message))
        .unwrap_or_else(|e| {
            tracing::error!("{}", e);
            format!("{}: {}", status, handlebars::html_escape(message))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> PageRenderer {
        PageRenderer::new().unwrap()
    }

    #[test]
    fn test_greeting_without_history() {
        let html = renderer().render_page(None, None, None).unwrap();
        assert!(html.contains("Document Assistant for PDFs"));
        assert!(html.contains("Hello User"));
        assert!(html.contains("Hello Bot"));
        assert_eq!(html.matches("chat-message user").count(), 1);
        assert_eq!(html.matches("chat-message bot").count(), 1);
    }

    #[test]
    fn test_history_alternates_templates() {
        let history = vec![
            ChatMessage::user("What is X?"),
            ChatMessage::bot("X is a letter."),
            ChatMessage::user("And Y?"),
            ChatMessage::bot("Y follows X."),
        ];
        let html = renderer().render_page(Some(&history), Some(3), None).unwrap();

        assert!(!html.contains("Hello User"));
        assert_eq!(html.matches("<div class=\"chat-message user\">").count(), 2);
        assert_eq!(html.matches("<div class=\"chat-message bot\">").count(), 2);

        let first = html.find("What is X?").unwrap();
        let second = html.find("X is a letter.").unwrap();
        let third = html.find("And Y?").unwrap();
        assert!(first < second && second < third);
        assert!(html.contains("3 chunk(s) indexed"));
    }

    #[test]
    fn test_messages_are_escaped() {
        let history = vec![
            ChatMessage::user("<script>alert('x')</script>"),
            ChatMessage::bot("a & b"),
        ];
        let html = renderer().render_page(Some(&history), Some(1), None).unwrap();

        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; b"));
    }

    #[test]
    fn test_notice_rendered_with_kind() {
        let notice = Notice::warning("No files Selected");
        let html = renderer().render_page(None, None, Some(&notice)).unwrap();
        assert!(html.contains("<div class=\"notice warning\">No files Selected</div>"));
    }

    #[test]
    fn test_shared_renderer_is_compiled_once() {
        let first = PageRenderer::shared().unwrap();
        let second = PageRenderer::shared().unwrap();
        assert!(std::ptr::eq(first, second));

        let html = first.render_error(StatusCode::BAD_GATEWAY, "model down").unwrap();
        assert!(html.contains("502"));
        assert!(html.contains("model down"));
    }

    #[test]
    fn test_error_page_escapes_message() {
        let html = error_page(StatusCode::UNPROCESSABLE_ENTITY, "bad <pdf>");
        assert!(html.contains("422 Unprocessable Entity"));
        assert!(html.contains("bad &lt;pdf&gt;"));
    }
}
