//! Conversation loop - drives one turn from user input to queued speech.
//!
//! A turn is: interrupt leftover playback, append the user message, stream
//! the reply through the [`SentenceSegmenter`], hand every completed sentence
//! to the [`SpeechSink`] as soon as it appears, and finally store the full
//! reply in the history.

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::domain::{ConversationHistory, Utterance};
use crate::ports::{ChatRequest, ChatTransport, EnqueueOutcome, SpeechSink, TransportError};
use crate::segmenter::SentenceSegmenter;

/// Outcome of a successful turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnSummary {
    /// Full assistant reply as stored in the history.
    pub reply: String,
    /// Utterances accepted by the speech sink.
    pub queued: usize,
    /// Utterances the sink refused (queue full or closed).
    pub dropped: usize,
}

/// Owns the conversation history and runs turns against the model.
pub struct ConversationLoop {
    transport: Arc<dyn ChatTransport>,
    speech: Arc<dyn SpeechSink>,
    model: String,
    history: ConversationHistory,
}

impl ConversationLoop {
    /// Create a loop with an empty history.
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        speech: Arc<dyn SpeechSink>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            speech,
            model: model.into(),
            history: ConversationHistory::new(),
        }
    }

    /// The conversation so far.
    #[must_use]
    pub const fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Run one turn.
    ///
    /// `on_delta` sees every text delta as it arrives (console echo).
    ///
    /// On a transport failure the turn is abandoned: the user message stays
    /// in the history, no assistant entry is stored, and the error is
    /// returned. Utterances queued before the failure are left to playback.
    pub async fn run_turn<F>(
        &mut self,
        input: &str,
        mut on_delta: F,
    ) -> Result<TurnSummary, TransportError>
    where
        F: FnMut(&str) + Send,
    {
        let purged = self.speech.interrupt();
        if purged > 0 {
            debug!(purged, "Discarded pending speech from previous turn");
        }

        self.history.push_user(input);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: self.history.messages().to_vec(),
        };

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat request"
        );

        let mut stream = self.transport.stream_chat(request).await?;
        let mut segmenter = SentenceSegmenter::new();
        let mut summary = TurnSummary::default();

        loop {
            let delta = match stream.next().await {
                Some(frame) => frame?,
                None => return Err(TransportError::UnexpectedEof),
            };

            on_delta(&delta.content);

            for sentence in segmenter.push(&delta.content) {
                self.enqueue(sentence, &mut summary);
            }

            if delta.done {
                break;
            }
        }

        let turn = segmenter.finish();
        if let Some(tail) = turn.tail {
            self.enqueue(tail, &mut summary);
        }

        self.history.push_assistant(turn.transcript.clone());
        summary.reply = turn.transcript;

        debug!(
            chars = summary.reply.len(),
            queued = summary.queued,
            dropped = summary.dropped,
            "Turn complete"
        );

        Ok(summary)
    }

    /// Interrupt playback without starting a turn (session exit).
    pub fn interrupt(&self) -> usize {
        self.speech.interrupt()
    }

    fn enqueue(&self, utterance: Utterance, summary: &mut TurnSummary) {
        let chars = utterance.len();
        match self.speech.speak(utterance) {
            EnqueueOutcome::Queued => summary.queued += 1,
            EnqueueOutcome::DroppedFull => {
                summary.dropped += 1;
                warn!(chars, "Playback queue full, dropping utterance");
            }
            EnqueueOutcome::Closed => {
                summary.dropped += 1;
                debug!(chars, "Speech output closed, utterance not spoken");
            }
        }
    }
}
