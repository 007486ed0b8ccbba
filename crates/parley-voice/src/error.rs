//! Playback error types.
//!
//! Every error here is scoped to a single utterance. The worker logs it,
//! reports a [`PlaybackEvent::Failed`](crate::PlaybackEvent::Failed) and moves
//! on to the next item.

use std::process::ExitStatus;

/// Errors from the speech synthesis service.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SynthesisError {
    /// The request could not be sent (connection refused, DNS, TLS, ...).
    #[error("Synthesis request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("Synthesis service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The audio body failed while streaming.
    #[error("Synthesis stream failed: {0}")]
    Stream(String),
}

/// Errors from the external audio player.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The player could not be started.
    #[error("Failed to start audio player '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The player exited unsuccessfully.
    #[error("Audio player exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    /// The audio payload failed while it was being fed to the player.
    #[error("Audio payload failed: {0}")]
    Payload(#[source] SynthesisError),

    /// IO error talking to the player process.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while playing one utterance.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
