//! The playback worker: the only consumer of the playback queue.
//!
//! Exactly one worker runs per [`PlaybackSession`](crate::PlaybackSession).
//! For each utterance it prepares the text, registers a cancellation handle
//! with the [`InterruptionController`], synthesizes, renders, and retires the
//! handle before taking the next item. Errors are reported and never stop
//! the loop.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{AudioRenderer, RenderOutcome, SpeechSynthesizer};
use crate::error::VoiceError;
use crate::interrupt::{InterruptionController, PlaybackTicket};
use crate::queue::QueuedUtterance;
use crate::text_utils::{SpeechFilter, plain_speech};

/// Progress reported by the worker, one or two events per utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Synthesis for the utterance has begun.
    Started { text: String },
    /// The utterance played to the end.
    Finished { text: String },
    /// The utterance was cancelled by an interrupt while playing.
    Interrupted { text: String },
    /// The utterance was dropped without being played.
    Skipped { text: String, reason: String },
    /// Synthesis or rendering failed.
    Failed { text: String, error: String },
}

impl PlaybackEvent {
    /// The utterance text this event refers to.
    pub fn text(&self) -> &str {
        match self {
            Self::Started { text }
            | Self::Finished { text }
            | Self::Interrupted { text }
            | Self::Skipped { text, .. }
            | Self::Failed { text, .. } => text,
        }
    }
}

pub(crate) const SKIP_INTERRUPTED: &str = "interrupted";
pub(crate) const SKIP_NOTHING_TO_SPEAK: &str = "nothing to speak";

/// Drains the playback queue one utterance at a time.
pub struct PlaybackWorker {
    controller: Arc<InterruptionController>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    renderer: Arc<dyn AudioRenderer>,
    strip_markdown: bool,
    events: Option<mpsc::UnboundedSender<PlaybackEvent>>,
    filter: SpeechFilter,
    /// Epoch the filter state belongs to.
    filter_epoch: u64,
}

impl PlaybackWorker {
    pub fn new(
        controller: Arc<InterruptionController>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        renderer: Arc<dyn AudioRenderer>,
    ) -> Self {
        Self {
            controller,
            synthesizer,
            renderer,
            strip_markdown: true,
            events: None,
            filter: SpeechFilter::new(),
            filter_epoch: 0,
        }
    }

    #[must_use]
    pub const fn with_markdown_stripping(mut self, enabled: bool) -> Self {
        self.strip_markdown = enabled;
        self
    }

    /// Publish [`PlaybackEvent`]s on `events`. A closed receiver is ignored.
    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<PlaybackEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run the worker on the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Consume the queue until it is closed.
    pub async fn run(mut self) {
        info!("Playback worker started");
        let queue = Arc::clone(self.controller.queue());
        while let Some(item) = queue.dequeue().await {
            self.play(item).await;
        }
        info!("Playback worker stopped");
    }

    async fn play(&mut self, item: QueuedUtterance) {
        let original = item.utterance.text().to_string();

        // Cheap early check; `begin` below is the authoritative one.
        if item.epoch != self.controller.epoch() {
            self.skip(original, SKIP_INTERRUPTED);
            return;
        }

        let Some(text) = self.prepare(&item) else {
            self.skip(original, SKIP_NOTHING_TO_SPEAK);
            return;
        };

        let Some(ticket) = self.controller.begin(item.epoch) else {
            self.skip(original, SKIP_INTERRUPTED);
            return;
        };

        debug!(epoch = ticket.epoch(), chars = text.len(), "Playing utterance");
        self.emit(PlaybackEvent::Started {
            text: original.clone(),
        });

        let result = self.synthesize_and_render(&text, &ticket).await;
        self.controller.finish(&ticket);

        let event = match result {
            Ok(RenderOutcome::Completed) => PlaybackEvent::Finished { text: original },
            Ok(RenderOutcome::Cancelled) => {
                debug!(epoch = ticket.epoch(), "Utterance interrupted");
                PlaybackEvent::Interrupted { text: original }
            }
            // Errors caused by tearing the render down are not failures.
            Err(_) if ticket.is_cancelled() => PlaybackEvent::Interrupted { text: original },
            Err(e) => {
                warn!(error = %e, chars = text.len(), "Failed to play utterance");
                PlaybackEvent::Failed {
                    text: original,
                    error: e.to_string(),
                }
            }
        };
        self.emit(event);
    }

    /// Speakable text for `item`, or `None` if there is nothing to say.
    fn prepare(&mut self, item: &QueuedUtterance) -> Option<String> {
        if !self.strip_markdown {
            return plain_speech(item.utterance.text());
        }
        if item.epoch != self.filter_epoch {
            // A new turn; blocks left open by the previous one do not carry over.
            self.filter.reset();
            self.filter_epoch = item.epoch;
        }
        self.filter.prepare(item.utterance.text())
    }

    async fn synthesize_and_render(
        &self,
        text: &str,
        ticket: &PlaybackTicket,
    ) -> Result<RenderOutcome, VoiceError> {
        let token = ticket.token().clone();

        let payload = tokio::select! {
            biased;
            () = token.cancelled() => return Ok(RenderOutcome::Cancelled),
            payload = self.synthesizer.synthesize(text) => payload?,
        };

        Ok(self.renderer.render(payload, token).await?)
    }

    fn skip(&self, text: String, reason: &str) {
        debug!(reason, "Skipping utterance");
        self.emit(PlaybackEvent::Skipped {
            text,
            reason: reason.to_string(),
        });
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures_util::stream;
    use parley_core::Utterance;

    use super::*;
    use crate::backend::{AudioPayload, MockAudioRenderer, MockSpeechSynthesizer};
    use crate::error::SynthesisError;
    use crate::queue::PlaybackQueue;

    fn payload(text: &str) -> AudioPayload {
        Box::pin(stream::iter(vec![Ok(Bytes::from(text.to_string()))]))
    }

    fn setup(
        synth: MockSpeechSynthesizer,
        renderer: MockAudioRenderer,
    ) -> (
        PlaybackWorker,
        Arc<InterruptionController>,
        mpsc::UnboundedReceiver<PlaybackEvent>,
    ) {
        let controller = Arc::new(InterruptionController::new(Arc::new(PlaybackQueue::new(10))));
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = PlaybackWorker::new(Arc::clone(&controller), Arc::new(synth), Arc::new(renderer))
            .with_events(tx);
        (worker, controller, rx)
    }

    fn item(text: &str, epoch: u64) -> QueuedUtterance {
        QueuedUtterance {
            utterance: Utterance::new(text),
            epoch,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[tokio::test]
    async fn plays_prepared_text_and_reports_finish() {
        let mut synth = MockSpeechSynthesizer::new();
        synth
            .expect_synthesize()
            .withf(|text| text.to_string() == "Hello world.")
            .times(1)
            .returning(|text| Ok(payload(text)));
        let mut renderer = MockAudioRenderer::new();
        renderer
            .expect_render()
            .times(1)
            .returning(|_, _| Ok(RenderOutcome::Completed));

        let (mut worker, controller, mut rx) = setup(synth, renderer);
        worker.play(item("**Hello** world.", 0)).await;

        assert_eq!(
            drain(&mut rx),
            vec![
                PlaybackEvent::Started {
                    text: "**Hello** world.".to_string()
                },
                PlaybackEvent::Finished {
                    text: "**Hello** world.".to_string()
                },
            ]
        );
        assert!(!controller.is_playing());
    }

    #[tokio::test]
    async fn synthesis_failure_is_reported_and_next_item_plays() {
        let mut synth = MockSpeechSynthesizer::new();
        synth
            .expect_synthesize()
            .withf(|text| text.to_string() == "Bad.")
            .returning(|_| {
                Err(SynthesisError::Status {
                    status: 500,
                    body: "boom".to_string(),
                })
            });
        synth
            .expect_synthesize()
            .withf(|text| text.to_string() == "Good.")
            .returning(|text| Ok(payload(text)));
        let mut renderer = MockAudioRenderer::new();
        renderer
            .expect_render()
            .times(1)
            .returning(|_, _| Ok(RenderOutcome::Completed));

        let (mut worker, controller, mut rx) = setup(synth, renderer);
        worker.play(item("Bad.", 0)).await;
        worker.play(item("Good.", 0)).await;

        let events = drain(&mut rx);
        assert!(matches!(
            &events[1],
            PlaybackEvent::Failed { text, error } if text == "Bad." && error.contains("500")
        ));
        assert_eq!(
            events.last(),
            Some(&PlaybackEvent::Finished {
                text: "Good.".to_string()
            })
        );
        assert!(!controller.is_playing());
    }

    #[tokio::test]
    async fn stale_epoch_is_skipped_without_synthesis() {
        let mut synth = MockSpeechSynthesizer::new();
        synth.expect_synthesize().never();
        let mut renderer = MockAudioRenderer::new();
        renderer.expect_render().never();

        let (mut worker, controller, mut rx) = setup(synth, renderer);
        controller.interrupt();
        worker.play(item("Old turn.", 0)).await;

        assert_eq!(
            drain(&mut rx),
            vec![PlaybackEvent::Skipped {
                text: "Old turn.".to_string(),
                reason: SKIP_INTERRUPTED.to_string()
            }]
        );
    }

    #[tokio::test]
    async fn markup_only_utterance_is_skipped() {
        let mut synth = MockSpeechSynthesizer::new();
        synth.expect_synthesize().never();
        let renderer = MockAudioRenderer::new();

        let (mut worker, _controller, mut rx) = setup(synth, renderer);
        worker.play(item("```", 0)).await;

        assert!(matches!(
            drain(&mut rx).as_slice(),
            [PlaybackEvent::Skipped { reason, .. }] if reason == SKIP_NOTHING_TO_SPEAK
        ));
    }

    #[tokio::test]
    async fn plain_mode_sends_text_unstripped() {
        let mut synth = MockSpeechSynthesizer::new();
        synth
            .expect_synthesize()
            .withf(|text| text.to_string() == "**Hi**.")
            .times(1)
            .returning(|text| Ok(payload(text)));
        let mut renderer = MockAudioRenderer::new();
        renderer
            .expect_render()
            .returning(|_, _| Ok(RenderOutcome::Completed));

        let (worker, _controller, _rx) = setup(synth, renderer);
        let mut worker = worker.with_markdown_stripping(false);
        worker.play(item(" **Hi**. ", 0)).await;
    }

    #[tokio::test]
    async fn cancelled_render_is_reported_as_interrupted() {
        let synth = {
            let mut synth = MockSpeechSynthesizer::new();
            synth.expect_synthesize().returning(|text| Ok(payload(text)));
            synth
        };
        let mut renderer = MockAudioRenderer::new();
        renderer
            .expect_render()
            .returning(|_, _| Ok(RenderOutcome::Cancelled));

        let (mut worker, _controller, mut rx) = setup(synth, renderer);
        worker.play(item("Cut off.", 0)).await;

        assert_eq!(
            drain(&mut rx).last(),
            Some(&PlaybackEvent::Interrupted {
                text: "Cut off.".to_string()
            })
        );
    }

    #[test]
    fn event_text_accessor() {
        let event = PlaybackEvent::Failed {
            text: "x".to_string(),
            error: "y".to_string(),
        };
        assert_eq!(event.text(), "x");
    }
}
