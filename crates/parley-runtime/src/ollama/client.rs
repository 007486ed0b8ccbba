//! Streaming `/api/chat` client.

use std::time::Duration;

use async_trait::async_trait;
use parley_core::{ChatRequest, ChatStream, ChatTransport, TransportError};
use tracing::{debug, warn};

use super::models::OllamaChatRequest;
use super::stream::decode_chat_stream;

/// Time allowed to establish the connection. Generation itself is unbounded.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body kept in [`TransportError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// [`ChatTransport`] backed by an Ollama server.
///
/// The underlying `reqwest::Client` is created once and reused across turns
/// so connections stay pooled.
#[derive(Debug, Clone)]
pub struct OllamaChatClient {
    http: reqwest::Client,
    endpoint: String,
}

impl OllamaChatClient {
    /// Create a client for the server at `server_url` (e.g. `http://localhost:11434`).
    pub fn new(server_url: &str) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(http, server_url))
    }

    /// Create a client that shares an existing connection pool.
    pub fn with_client(http: reqwest::Client, server_url: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}/api/chat", server_url.trim_end_matches('/')),
        }
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for OllamaChatClient {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, TransportError> {
        let body = OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: true,
        };

        debug!(
            endpoint = %self.endpoint,
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint = %self.endpoint, error = %e, "Chat request failed");
                TransportError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Model server returned error status");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        Ok(decode_chat_stream(response.bytes_stream()))
    }
}
