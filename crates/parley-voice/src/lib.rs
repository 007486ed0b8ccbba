#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod backend;
pub mod error;
pub mod interrupt;
pub mod queue;
pub mod session;
pub mod text_utils;
pub mod worker;

// Re-export key types for convenience
pub use backend::{
    AudioPayload, AudioRenderer, HttpSpeechSynthesizer, ProcessAudioRenderer, RenderOutcome,
    SpeechSynthesizer,
};
pub use error::{RenderError, SynthesisError, VoiceError};
pub use interrupt::{InterruptionController, PlaybackTicket};
pub use queue::{PlaybackQueue, QueuedUtterance};
pub use session::{PlaybackConfig, PlaybackSession};
pub use worker::{PlaybackEvent, PlaybackWorker};

// Silence unused dev-dependency warnings
#[cfg(test)]
use axum as _;
