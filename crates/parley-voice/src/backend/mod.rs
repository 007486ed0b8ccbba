//! Speech backend traits: engine-agnostic interfaces for synthesis and
//! rendering.
//!
//! The [`PlaybackWorker`](crate::worker::PlaybackWorker) operates on trait
//! objects (`Arc<dyn SpeechSynthesizer>`, `Arc<dyn AudioRenderer>`) so the
//! synthesis service and the audio player can be swapped (or faked in tests)
//! without touching the playback logic.
//!
//! ## Implementations
//!
//! | Module      | Type                      | Role        |
//! |-------------|---------------------------|-------------|
//! | [`http`]    | [`HttpSpeechSynthesizer`] | synthesis   |
//! | [`process`] | [`ProcessAudioRenderer`]  | rendering   |

pub mod http;
pub mod process;

use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use tokio_util::sync::CancellationToken;

use crate::error::{RenderError, SynthesisError};

pub use http::HttpSpeechSynthesizer;
pub use process::ProcessAudioRenderer;

/// Encoded audio streamed from the synthesizer to the renderer.
pub type AudioPayload = Pin<Box<dyn Stream<Item = Result<Bytes, SynthesisError>> + Send>>;

/// How a render ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The player consumed the whole payload and exited normally.
    Completed,
    /// The render was cancelled and the player was terminated.
    Cancelled,
}

/// Backend-agnostic text-to-speech service.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Request audio for `text`.
    ///
    /// Resolves once the service has accepted the request; the audio itself
    /// is streamed through the returned payload.
    async fn synthesize(&self, text: &str) -> Result<AudioPayload, SynthesisError>;
}

/// Backend-agnostic audio output.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AudioRenderer: Send + Sync {
    /// Play `payload` until it is exhausted or `cancel` fires.
    ///
    /// On cancellation the implementation must stop output immediately
    /// rather than let the audio finish, and must release everything it
    /// started before returning.
    async fn render(
        &self,
        payload: AudioPayload,
        cancel: CancellationToken,
    ) -> Result<RenderOutcome, RenderError>;
}
