//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No HTTP or process types in any signature
//! - Errors are scoped: a transport error belongs to one turn only
//! - Speech output is fire-and-forget from the caller's point of view

pub mod chat_transport;
pub mod speech_sink;

pub use chat_transport::{ChatDelta, ChatRequest, ChatStream, ChatTransport, TransportError};
pub use speech_sink::{EnqueueOutcome, NoopSpeechSink, SpeechSink};

#[cfg(test)]
pub use chat_transport::MockChatTransport;
