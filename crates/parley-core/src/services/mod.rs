//! Application services orchestrating domain logic over ports.

pub mod conversation;

pub use conversation::{ConversationLoop, TurnSummary};
