#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod ollama;

pub use ollama::{OllamaChatClient, decode_chat_stream};

// Silence unused dev-dependency warnings
#[cfg(test)]
use axum as _;
