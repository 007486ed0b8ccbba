//! Interruption of in-flight and pending playback.
//!
//! The controller and the playback worker share exactly one piece of mutable
//! state: the [`PlaybackSlot`], holding the token of the utterance currently
//! rendering plus the interruption epoch. It lives behind a single mutex that
//! is only held to register, retire or cancel, never across a render.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::queue::PlaybackQueue;

#[derive(Debug)]
struct ActivePlayback {
    id: u64,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct PlaybackSlot {
    /// Bumped by every `interrupt()`.
    epoch: u64,
    active: Option<ActivePlayback>,
}

/// Permission for the worker to render one utterance.
///
/// Obtained from [`InterruptionController::begin`] and handed back through
/// [`InterruptionController::finish`] once the render has ended.
#[derive(Debug)]
pub struct PlaybackTicket {
    id: u64,
    epoch: u64,
    token: CancellationToken,
}

impl PlaybackTicket {
    /// Token cancelled when this playback is interrupted.
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Owns the live cancellation handle and purges the playback queue.
#[derive(Debug)]
pub struct InterruptionController {
    slot: Mutex<PlaybackSlot>,
    queue: Arc<PlaybackQueue>,
    next_id: AtomicU64,
}

impl InterruptionController {
    pub fn new(queue: Arc<PlaybackQueue>) -> Self {
        Self {
            slot: Mutex::new(PlaybackSlot::default()),
            queue,
            next_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlaybackSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The queue this controller purges.
    pub const fn queue(&self) -> &Arc<PlaybackQueue> {
        &self.queue
    }

    /// Current interruption epoch. New utterances are stamped with it.
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Register a fresh cancellation handle for an utterance queued under
    /// `epoch`.
    ///
    /// Returns `None` when an interrupt has happened since the utterance was
    /// queued; the caller must then drop it without rendering.
    pub fn begin(&self, epoch: u64) -> Option<PlaybackTicket> {
        let mut slot = self.lock();
        if slot.epoch != epoch {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        if let Some(previous) = slot.active.replace(ActivePlayback {
            id,
            token: token.clone(),
        }) {
            // Only one render may be live.
            previous.token.cancel();
        }
        drop(slot);

        Some(PlaybackTicket { id, epoch, token })
    }

    /// Retire the handle registered for `ticket`.
    ///
    /// A newer registration is left untouched, so a late `finish` can never
    /// retire someone else's handle.
    pub fn finish(&self, ticket: &PlaybackTicket) {
        let mut slot = self.lock();
        if slot.active.as_ref().is_some_and(|a| a.id == ticket.id) {
            slot.active = None;
        }
    }

    /// Cancel the active render (if any), then purge pending utterances.
    ///
    /// Returns the number of purged utterances. Calling this with nothing
    /// playing and nothing queued is a no-op apart from the epoch bump.
    pub fn interrupt(&self) -> usize {
        let cancelled = {
            let mut slot = self.lock();
            slot.epoch += 1;
            slot.active.take().map(|active| {
                active.token.cancel();
                active.id
            })
        };

        let purged = self.queue.purge();
        debug!(
            purged,
            cancelled_render = cancelled.is_some(),
            epoch = self.epoch(),
            "Playback interrupted"
        );
        purged
    }

    /// Whether a render handle is currently registered.
    pub fn is_playing(&self) -> bool {
        self.lock().active.is_some()
    }
}
