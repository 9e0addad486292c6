//! OpenAI-compatible chat provider.
//!
//! Works against `https://api.openai.com/v1` and any server exposing the same
//! `/chat/completions` surface. Streaming uses server-sent events.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use crate::providers::{drain_lines, http_client};
use crate::types::{LlmMessage, ProviderType};
use docu_core::{AppError, AppResult};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [LlmMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamEvent {
    model: String,
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat client.
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiClient {
    /// Create a client against the public OpenAI API.
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> AppResult<Self> {
        Self::with_endpoint(ProviderType::OpenAI.default_endpoint(), api_key, timeout_secs)
    }

    /// Create a client against a custom OpenAI-compatible base URL.
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> AppResult<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        tracing::debug!(endpoint = %endpoint, "OpenAI client configured");

        Ok(Self {
            client: http_client(timeout_secs)?,
            endpoint,
            api_key: api_key.into(),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }

    fn to_chat_request<'a>(&self, request: &'a LlmRequest, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
        }
    }

    async fn send(&self, request: &LlmRequest, stream: bool) -> AppResult<reqwest::Response> {
        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&self.to_chat_request(request, stream))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to OpenAI: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

/// Parse one SSE line. Returns `None` for lines that carry no event data.
fn parse_sse_line(line: &str) -> Option<AppResult<LlmStreamChunk>> {
    let data = line.strip_prefix("data:")?.trim();

    if data == "[DONE]" {
        return Some(Ok(LlmStreamChunk {
            content: String::new(),
            model: String::new(),
            done: true,
            usage: None,
        }));
    }

    let event: StreamEvent = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(e) => return Some(Err(AppError::Llm(format!("Failed to parse chunk: {}", e)))),
    };

    let choice = event.choices.into_iter().next();
    let done = choice
        .as_ref()
        .and_then(|c| c.finish_reason.as_ref())
        .is_some();
    let content = choice.and_then(|c| c.delta.content).unwrap_or_default();

    Some(Ok(LlmStreamChunk {
        content,
        model: event.model,
        done,
        usage: None,
    }))
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        ProviderType::OpenAI.as_str()
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(model = %request.model, messages = request.messages.len(), "Sending chat request to OpenAI");

        let response = self.send(request, false).await?;
        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse OpenAI response: {}", e)))?;

        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Llm("OpenAI response contained no choices".to_string()))?;

        let usage = chat
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();
        tracing::debug!(total_tokens = usage.total_tokens, finish_reason = ?choice.finish_reason, "Received completion from OpenAI");

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            model: chat.model,
            usage,
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::info!(model = %request.model, "Starting streaming chat request to OpenAI");

        let response = self.send(request, true).await?;

        let stream = response
            .bytes_stream()
            .scan(Vec::new(), |buffer: &mut Vec<u8>, result| {
                let items: Vec<AppResult<LlmStreamChunk>> = match result {
                    Ok(bytes) => {
                        buffer.extend_from_slice(&bytes);
                        drain_lines(buffer)
                            .iter()
                            .filter_map(|l| parse_sse_line(l))
                            .collect()
                    }
                    Err(e) => vec![Err(AppError::Llm(format!("Stream error: {}", e)))],
                };
                futures::future::ready(Some(futures::stream::iter(items)))
            })
            .flatten();

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_url_trims_slash() {
        let client = OpenAiClient::with_endpoint("http://localhost:8000/v1/", "sk-test", 5).unwrap();
        assert_eq!(client.chat_url(), "http://localhost:8000/v1/chat/completions");
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_request_body_shape() {
        let client = OpenAiClient::new("sk-test", 5).unwrap();
        let request = LlmRequest::new("What is X?", "gpt-3.5-turbo")
            .with_system("Use the context")
            .with_temperature(0.0);

        let body = serde_json::to_value(client.to_chat_request(&request, false)).unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "What is X?");
        assert_eq!(body["temperature"], 0.0);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_sse_delta() {
        let line = r#"data: {"model":"gpt-3.5-turbo","choices":[{"delta":{"content":"Hi"},"finish_reason":null}]}"#;
        let chunk = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(chunk.content, "Hi");
        assert!(!chunk.done);
    }

    #[test]
    fn test_parse_sse_done_and_comments() {
        let done = parse_sse_line("data: [DONE]").unwrap().unwrap();
        assert!(done.done);
        assert!(parse_sse_line(": keep-alive").is_none());
    }

    #[test]
    fn test_parse_full_response() {
        let json = r#"{"model":"gpt-3.5-turbo","choices":[{"message":{"role":"assistant","content":"X is a letter."},"finish_reason":"stop"}],"usage":{"prompt_tokens":20,"completion_tokens":5,"total_tokens":25}}"#;
        let chat: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(chat.choices[0].message.content.as_deref(), Some("X is a letter."));
        assert_eq!(chat.usage.map(|u| u.prompt_tokens), Some(20));
    }
}
