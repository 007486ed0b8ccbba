//! Ollama `/api/chat` streaming adapter.

mod client;
pub mod models;
mod stream;

pub use client::OllamaChatClient;
pub use stream::decode_chat_stream;
