//! Domain types for parley.
//!
//! These are pure data types with no infrastructure dependencies.

pub mod chat;
pub mod utterance;

pub use chat::{ChatMessage, ConversationHistory, MessageRole};
pub use utterance::Utterance;
