//! Speech output port.
//!
//! The conversation loop only needs two things from playback: stop whatever
//! is playing, and accept the next utterance without blocking.

use crate::domain::Utterance;

/// Result of handing an utterance to playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The utterance is waiting for playback.
    Queued,
    /// The pending queue was at capacity; the utterance was discarded.
    DroppedFull,
    /// Playback has shut down.
    Closed,
}

impl EnqueueOutcome {
    #[must_use]
    pub const fn is_queued(self) -> bool {
        matches!(self, Self::Queued)
    }
}

/// Sink for speakable utterances.
pub trait SpeechSink: Send + Sync {
    /// Cancel the active render and discard all pending utterances.
    ///
    /// Returns how many pending utterances were discarded. Calling this with
    /// nothing playing is a no-op.
    fn interrupt(&self) -> usize;

    /// Queue an utterance for playback without blocking.
    fn speak(&self, utterance: Utterance) -> EnqueueOutcome;
}

/// Sink that discards everything (text-only sessions).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSpeechSink;

impl SpeechSink for NoopSpeechSink {
    fn interrupt(&self) -> usize {
        0
    }

    fn speak(&self, _utterance: Utterance) -> EnqueueOutcome {
        EnqueueOutcome::Closed
    }
}
