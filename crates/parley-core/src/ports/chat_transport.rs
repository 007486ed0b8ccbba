//! Model transport port.
//!
//! One streaming request/response exchange per turn: the request carries the
//! full ordered history and a model identifier, the response is a sequence of
//! incremental text frames terminated by a frame with `done` set.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use serde::Serialize;
use thiserror::Error;

use crate::domain::ChatMessage;

/// A chat request for a single turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    /// Model identifier understood by the server.
    pub model: String,
    /// Complete conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,
}

/// One incremental frame of the model's reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatDelta {
    /// Newly generated text (may be empty).
    pub content: String,
    /// Set on the final frame of the reply.
    pub done: bool,
}

impl ChatDelta {
    /// A non-final content frame.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
        }
    }

    /// A final frame carrying `content`.
    pub fn last(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: true,
        }
    }
}

/// Stream of reply frames for one turn.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatDelta, TransportError>> + Send>>;

/// Failure of the model exchange. Aborts the current turn only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be sent (connection refused, DNS, TLS, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// A frame could not be decoded.
    #[error("malformed stream frame: {0}")]
    Framing(String),

    /// Reading the response body failed mid-stream.
    #[error("stream interrupted: {0}")]
    Stream(String),

    /// The server reported an error inside the stream.
    #[error("server error: {0}")]
    Server(String),

    /// The body ended before the final frame.
    #[error("stream ended before the final frame")]
    UnexpectedEof,
}

/// Streams chat completions from a language-model service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Start a streaming exchange for `request`.
    ///
    /// Errors that occur before the first frame (connection, status) are
    /// returned directly; later errors arrive as stream items.
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, TransportError>;
}
