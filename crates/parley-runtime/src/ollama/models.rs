//! Ollama chat wire types.
//!
//! Only the fields parley reads are modelled; unknown fields are ignored so
//! newer server versions keep working.

use parley_core::ChatMessage;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat`.
#[derive(Debug, Serialize)]
pub struct OllamaChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
}

/// Message payload inside a stream frame.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaChatMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

/// One NDJSON line of a streaming `/api/chat` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaChatStreamChunk {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub message: Option<OllamaChatMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub eval_count: Option<u32>,
    /// Set instead of `message` when the server fails mid-stream.
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_history_and_stream_flag() {
        let messages = vec![ChatMessage::user("Hi"), ChatMessage::assistant("Hello.")];
        let body = OllamaChatRequest {
            model: "openchat",
            messages: &messages,
            stream: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "openchat",
                "messages": [
                    {"role": "user", "content": "Hi"},
                    {"role": "assistant", "content": "Hello."}
                ],
                "stream": true
            })
        );
    }

    #[test]
    fn chunk_parses_full_ollama_frame() {
        let line = r#"{"model":"openchat","created_at":"2024-01-01T00:00:00Z","message":{"role":"assistant","content":"Hi","images":null},"done":false}"#;
        let chunk: OllamaChatStreamChunk = serde_json::from_str(line).unwrap();
        assert_eq!(chunk.model.as_deref(), Some("openchat"));
        assert_eq!(chunk.message.unwrap().content, "Hi");
        assert!(!chunk.done);
    }

    #[test]
    fn final_chunk_may_omit_message() {
        let chunk: OllamaChatStreamChunk =
            serde_json::from_str(r#"{"done":true,"done_reason":"stop","eval_count":12}"#).unwrap();
        assert!(chunk.done);
        assert!(chunk.message.is_none());
        assert_eq!(chunk.eval_count, Some(12));
    }
}
