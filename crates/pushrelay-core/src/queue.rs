//! Replay queue
//!
//! Ordered buffer of messages that arrived before the background environment
//! was ready. Enqueue and drain are serialized by one lock, so a message is
//! either part of a drain or still queued afterwards, never both.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

use crate::config::{OverflowPolicy, QueueConfig};
use crate::types::Message;

// ----------------------------------------------------------------------------
// Enqueue Outcome
// ----------------------------------------------------------------------------

/// Result of offering a message to the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enqueue {
    /// Appended
    Queued,
    /// Appended after evicting the oldest queued message (bounded, drop-oldest)
    QueuedEvicting(Message),
    /// Refused because the queue is full (bounded, reject)
    Rejected(Message),
    /// Not queued because the bypass condition held; caller delivers it
    Bypassed(Message),
}

// ----------------------------------------------------------------------------
// Replay Queue
// ----------------------------------------------------------------------------

/// FIFO queue of pending messages, safe for many enqueuers and one drainer
#[derive(Debug)]
pub struct ReplayQueue {
    messages: Mutex<VecDeque<Message>>,
    config: QueueConfig,
}

impl Default for ReplayQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

impl ReplayQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            config,
        }
    }

    /// Unbounded queue
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.config.capacity
    }

    /// Append a message
    pub fn enqueue(&self, message: Message) -> Enqueue {
        let mut messages = self.lock();
        self.push(&mut messages, message)
    }

    /// Append a message unless `bypass` returns true
    ///
    /// `bypass` is evaluated while the queue lock is held. A flag that is set
    /// before a drain takes the lock is therefore observed by every enqueue
    /// that runs after that drain, which is what makes readiness checks
    /// race-free against replay.
    pub fn enqueue_unless<F>(&self, message: Message, bypass: F) -> Enqueue
    where
        F: FnOnce() -> bool,
    {
        self.enqueue_unless_with(|| message, bypass)
    }

    /// Like `enqueue_unless`, building the message under the queue lock
    ///
    /// Sequence numbers assigned inside `make` follow queue order.
    pub fn enqueue_unless_with<M, F>(&self, make: M, bypass: F) -> Enqueue
    where
        M: FnOnce() -> Message,
        F: FnOnce() -> bool,
    {
        let mut messages = self.lock();
        let message = make();
        if bypass() {
            return Enqueue::Bypassed(message);
        }
        self.push(&mut messages, message)
    }

    /// Remove and return everything queued, oldest first
    pub fn drain_all(&self) -> Vec<Message> {
        let mut messages = self.lock();
        messages.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn push(&self, messages: &mut VecDeque<Message>, message: Message) -> Enqueue {
        let Some(capacity) = self.config.capacity else {
            messages.push_back(message);
            return Enqueue::Queued;
        };

        if messages.len() < capacity {
            messages.push_back(message);
            return Enqueue::Queued;
        }

        match self.config.overflow {
            OverflowPolicy::DropOldest => match messages.pop_front() {
                Some(evicted) => {
                    warn!(
                        "Replay queue full ({}), evicting message #{}",
                        capacity,
                        evicted.sequence()
                    );
                    messages.push_back(message);
                    Enqueue::QueuedEvicting(evicted)
                }
                // Zero capacity: nothing to evict, nothing can be held
                None => {
                    warn!(
                        "Replay queue has no capacity, rejecting message #{}",
                        message.sequence()
                    );
                    Enqueue::Rejected(message)
                }
            },
            OverflowPolicy::Reject => {
                warn!(
                    "Replay queue full ({}), rejecting message #{}",
                    capacity,
                    message.sequence()
                );
                Enqueue::Rejected(message)
            }
        }
    }

    // Queue contents stay consistent across a panicking holder: every
    // critical section is a single VecDeque operation.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Message>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
