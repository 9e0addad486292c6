//! Chat-completion provider implementations.

pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use docu_core::{AppError, AppResult};
use std::time::Duration;

/// Build an HTTP client with a request timeout.
pub(crate) fn http_client(timeout_secs: u64) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))
}

/// Remove every complete line from `buffer`, leaving a trailing partial line in place.
///
/// Streaming bodies arrive in arbitrary byte chunks, so a JSON record, an SSE
/// event or a multi-byte character can be split across two reads. Lines are
/// decoded only once complete.
pub(crate) fn drain_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = buffer.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end_matches(['\n', '\r']);
        if !line.trim().is_empty() {
            lines.push(line.to_string());
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_lines_keeps_partial_tail() {
        let mut buffer = b"{\"a\":1}\n{\"b\":".to_vec();
        let lines = drain_lines(&mut buffer);
        assert_eq!(lines, vec!["{\"a\":1}".to_string()]);
        assert_eq!(buffer, b"{\"b\":");

        buffer.extend_from_slice(b"2}\r\n\n");
        let lines = drain_lines(&mut buffer);
        assert_eq!(lines, vec!["{\"b\":2}".to_string()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_lines_multibyte_split_across_reads() {
        let event = "data: {\"content\":\"é\"}\n".as_bytes();
        let split = event.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut buffer = event[..split].to_vec();
        assert!(drain_lines(&mut buffer).is_empty());

        buffer.extend_from_slice(&event[split..]);
        let lines = drain_lines(&mut buffer);
        assert_eq!(lines, vec!["data: {\"content\":\"é\"}".to_string()]);
        assert!(!lines[0].contains('\u{FFFD}'));
    }
}
