//! Playback session: one queue, one controller, one worker.
//!
//! All shared playback state is scoped to a [`PlaybackSession`] created at
//! startup and shut down explicitly, so several independent sessions can
//! exist side by side (tests create many).

use std::sync::{Arc, Mutex, PoisonError};

use parley_core::{EnqueueOutcome, Settings, SpeechSink, Utterance};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{AudioRenderer, SpeechSynthesizer};
use crate::interrupt::InterruptionController;
use crate::queue::{PlaybackQueue, QueuedUtterance};
use crate::worker::{PlaybackEvent, PlaybackWorker};

/// Session tuning taken from [`Settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    pub queue_capacity: usize,
    pub strip_markdown: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for PlaybackConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            queue_capacity: settings.queue_capacity,
            strip_markdown: settings.strip_markdown,
        }
    }
}

/// Handle to a running playback pipeline.
pub struct PlaybackSession {
    controller: Arc<InterruptionController>,
    worker: Mutex<Option<JoinHandle<()>>>,
    events: Mutex<Option<mpsc::UnboundedReceiver<PlaybackEvent>>>,
}

impl PlaybackSession {
    /// Build the queue and controller and spawn the worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: PlaybackConfig,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        renderer: Arc<dyn AudioRenderer>,
    ) -> Self {
        let queue = Arc::new(PlaybackQueue::new(config.queue_capacity));
        let controller = Arc::new(InterruptionController::new(queue));
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = PlaybackWorker::new(Arc::clone(&controller), synthesizer, renderer)
            .with_markdown_stripping(config.strip_markdown)
            .with_events(tx)
            .spawn();

        info!(
            queue_capacity = config.queue_capacity,
            strip_markdown = config.strip_markdown,
            "Playback session started"
        );

        Self {
            controller,
            worker: Mutex::new(Some(worker)),
            events: Mutex::new(Some(rx)),
        }
    }

    /// Take the playback event stream. Only the first call returns it.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<PlaybackEvent>> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Queue an utterance for playback under the current epoch.
    pub fn speak(&self, utterance: Utterance) -> EnqueueOutcome {
        let item = QueuedUtterance {
            utterance,
            epoch: self.controller.epoch(),
        };
        self.controller.queue().enqueue(item)
    }

    /// Stop the current render and drop everything pending.
    ///
    /// Returns the number of pending utterances removed.
    pub fn interrupt(&self) -> usize {
        self.controller.interrupt()
    }

    /// Whether an utterance is being synthesized or rendered right now.
    pub fn is_playing(&self) -> bool {
        self.controller.is_playing()
    }

    /// Number of utterances waiting to be played.
    pub fn pending(&self) -> usize {
        self.controller.queue().len()
    }

    pub const fn controller(&self) -> &Arc<InterruptionController> {
        &self.controller
    }

    /// Interrupt, close the queue and wait for the worker to exit.
    ///
    /// Idempotent; later calls return immediately.
    pub async fn shutdown(&self) {
        self.interrupt();
        self.controller.queue().close();

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!(error = %e, "Playback worker ended abnormally");
            }
            info!("Playback session shut down");
        }
    }
}

impl SpeechSink for PlaybackSession {
    fn interrupt(&self) -> usize {
        Self::interrupt(self)
    }

    fn speak(&self, utterance: Utterance) -> EnqueueOutcome {
        Self::speak(self, utterance)
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        let queue = self.controller.queue();
        if !queue.is_closed() {
            debug!("Playback session dropped without shutdown");
            self.controller.interrupt();
            queue.close();
        }
    }
}
