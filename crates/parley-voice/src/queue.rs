//! Bounded FIFO of utterances waiting for playback.
//!
//! The producer is the chat stream reader, which must never wait on a slow
//! player. [`PlaybackQueue::enqueue`] is therefore synchronous and drops the
//! newest utterance when the queue is full. The single consumer waits
//! asynchronously in [`PlaybackQueue::dequeue`].

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use parley_core::{EnqueueOutcome, Utterance};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// An utterance stamped with the interruption epoch it was queued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUtterance {
    pub utterance: Utterance,
    pub epoch: u64,
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<QueuedUtterance>,
    closed: bool,
}

/// Bounded, closable playback queue.
#[derive(Debug)]
pub struct PlaybackQueue {
    state: Mutex<QueueState>,
    available: Notify,
    capacity: usize,
}

impl PlaybackQueue {
    /// Create a queue holding at most `capacity` pending utterances.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity.min(64)),
                closed: false,
            }),
            available: Notify::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an utterance without blocking.
    ///
    /// Returns [`EnqueueOutcome::DroppedFull`] when the queue is at capacity
    /// and [`EnqueueOutcome::Closed`] after [`close`](Self::close).
    pub fn enqueue(&self, item: QueuedUtterance) -> EnqueueOutcome {
        let mut state = self.lock();
        if state.closed {
            return EnqueueOutcome::Closed;
        }
        if state.items.len() >= self.capacity {
            warn!(
                capacity = self.capacity,
                chars = item.utterance.len(),
                "Playback queue full, dropping utterance"
            );
            return EnqueueOutcome::DroppedFull;
        }
        state.items.push_back(item);
        let queue_len = state.items.len();
        drop(state);

        debug!(queue_len, "Utterance queued");
        self.available.notify_one();
        EnqueueOutcome::Queued
    }

    /// Take the oldest utterance if one is ready.
    pub fn try_dequeue(&self) -> Option<QueuedUtterance> {
        self.lock().items.pop_front()
    }

    /// Wait for the oldest utterance.
    ///
    /// Returns `None` once the queue has been closed; anything still pending
    /// at that point is abandoned.
    pub async fn dequeue(&self) -> Option<QueuedUtterance> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register interest before checking so a concurrent enqueue or
            // close between the check and the await is not missed.
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
            }

            notified.await;
        }
    }

    /// Remove every pending utterance and return how many were removed.
    ///
    /// Never blocks on the consumer and keeps the queue open: utterances
    /// enqueued after the purge are delivered normally.
    pub fn purge(&self) -> usize {
        let mut state = self.lock();
        let purged = state.items.len();
        state.items.clear();
        purged
    }

    /// Permanently close the queue and wake the consumer.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_waiters();
        // Covers a consumer that has not reached `enable` yet.
        self.available.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of pending utterances.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
