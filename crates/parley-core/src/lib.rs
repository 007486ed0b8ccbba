#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod ports;
pub mod segmenter;
pub mod services;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{ChatMessage, ConversationHistory, MessageRole, Utterance};
pub use ports::{
    ChatDelta, ChatRequest, ChatStream, ChatTransport, EnqueueOutcome, NoopSpeechSink,
    SpeechSink, TransportError,
};
pub use segmenter::{FinishedTurn, SENTENCE_TERMINATOR, SentenceSegmenter};
pub use services::{ConversationLoop, TurnSummary};
pub use settings::{
    DEFAULT_MODEL, DEFAULT_QUEUE_CAPACITY, DEFAULT_SERVER_URL, DEFAULT_SYNTHESIS_URL,
    PlayerSettings, Settings, SettingsError, VoiceSettings, validate_settings,
};
