//! Consumer readiness gate
//!
//! Tracks the background execution environment through
//! `NotStarted → Starting → Ready`. Transitions are compare-and-swap guarded
//! and only ever move forward; readers may poll from any thread or await
//! `wait_ready`.

use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::Notify;
use tracing::debug;

use crate::types::ReadinessState;

/// Tri-state readiness gate with wait/notify
#[derive(Debug)]
pub struct ConsumerReadiness {
    state: AtomicU8,
    ready: Notify,
}

impl Default for ConsumerReadiness {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumerReadiness {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ReadinessState::NotStarted as u8),
            ready: Notify::new(),
        }
    }

    pub fn current_state(&self) -> ReadinessState {
        ReadinessState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_ready(&self) -> bool {
        self.current_state() == ReadinessState::Ready
    }

    /// `NotStarted → Starting`
    ///
    /// Returns `true` only for the caller that performed the transition; that
    /// caller owns the bootstrap. Every other call is a no-op.
    pub fn begin_start(&self) -> bool {
        let won = self
            .state
            .compare_exchange(
                ReadinessState::NotStarted as u8,
                ReadinessState::Starting as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if won {
            debug!("Readiness: NotStarted -> Starting");
        }
        won
    }

    /// `NotStarted | Starting → Ready`
    ///
    /// Returns `true` for the single call that made the environment ready.
    pub fn mark_ready(&self) -> bool {
        let previous = self
            .state
            .swap(ReadinessState::Ready as u8, Ordering::SeqCst);
        let previous = ReadinessState::from_u8(previous);
        if previous == ReadinessState::Ready {
            return false;
        }
        debug!("Readiness: {} -> Ready", previous);
        self.ready.notify_waiters();
        true
    }

    /// Resolve once the gate reaches `Ready`
    pub async fn wait_ready(&self) {
        loop {
            let notified = self.ready.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent mark_ready is not missed.
            notified.as_mut().enable();
            if self.is_ready() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_forward_transitions() {
        let gate = ConsumerReadiness::new();
        assert_eq!(gate.current_state(), ReadinessState::NotStarted);

        assert!(gate.begin_start());
        assert_eq!(gate.current_state(), ReadinessState::Starting);
        assert!(!gate.begin_start());

        assert!(gate.mark_ready());
        assert!(gate.is_ready());
        assert!(!gate.mark_ready());

        // Never moves backwards
        assert!(!gate.begin_start());
        assert_eq!(gate.current_state(), ReadinessState::Ready);
    }

    #[test]
    fn test_ready_without_start() {
        let gate = ConsumerReadiness::new();
        assert!(gate.mark_ready());
        assert!(!gate.begin_start());
        assert_eq!(gate.current_state(), ReadinessState::Ready);
    }

    #[test]
    fn test_wait_ready_wakes_on_transition() {
        let gate = ConsumerReadiness::new();
        let mut waiter = task::spawn(gate.wait_ready());
        assert_pending!(waiter.poll());

        gate.begin_start();
        assert_pending!(waiter.poll());

        gate.mark_ready();
        assert!(waiter.is_woken());
        assert_ready!(waiter.poll());
    }

    #[test]
    fn test_wait_ready_when_already_ready() {
        let gate = ConsumerReadiness::new();
        gate.mark_ready();
        let mut waiter = task::spawn(gate.wait_ready());
        assert_ready!(waiter.poll());
    }

    #[test]
    fn test_single_starter_across_threads() {
        let gate = Arc::new(ConsumerReadiness::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                std::thread::spawn(move || gate.begin_start())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(gate.current_state(), ReadinessState::Starting);
    }
}
