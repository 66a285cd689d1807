//! Relay core
//!
//! Decides for every inbound push message whether it goes to the interactive
//! consumer, into the replay queue, or straight to the background dispatcher,
//! and replays the queue once the background environment reports ready.
//!
//! ```text
//! vendor SDK ──► on_message ──┬─ empty payload ─────────────► ignored
//!                             ├─ foreground ────────────────► NotificationSink
//!                             ├─ not Ready ─────────────────► ReplayQueue
//!                             └─ Ready ─────────────────────► DispatchSink
//!
//! environment ─► on_ready ──► mark Ready ──► drain ReplayQueue ──► DispatchSink (FIFO)
//! ```
//!
//! Nothing here returns an error to the caller. Resolution failures drop the
//! message and log a `Fatal:` error; there is no retry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use pushrelay_core::{
    CallbackHandle, ConsumerReadiness, Enqueue, ForegroundProbe, HandleRegistry, Message,
    Notification, ReadinessState, RelayConfig, RelayError, RelayResult, RemoteMessage,
    ReplayQueue,
};
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, error, info, trace, warn};

use crate::bootstrap::{BootstrapRequest, BootstrapTask, EnvironmentBootstrap};
use crate::callback::CallbackResolver;
use crate::notify::NotificationSink;
use crate::sink::DispatchSink;

// ----------------------------------------------------------------------------
// Routing
// ----------------------------------------------------------------------------

/// Where an inbound message ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Route {
    /// No payload
    Ignored,
    /// Delivered to the interactive consumer
    Interactive,
    /// Held for replay
    Queued,
    /// Delivered to the background dispatcher
    Dispatched,
    /// Permanently dropped (resolution failure or queue overflow)
    Dropped,
}

// ----------------------------------------------------------------------------
// Statistics
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RelayCounters {
    received: AtomicU64,
    ignored: AtomicU64,
    interactive: AtomicU64,
    queued: AtomicU64,
    dispatched: AtomicU64,
    replayed: AtomicU64,
    dropped: AtomicU64,
    overflowed: AtomicU64,
    tokens: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Snapshot of relay activity
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RelayStatistics {
    /// Messages with a payload
    pub received: u64,
    /// Messages without a payload
    pub ignored: u64,
    /// Delivered on the interactive path
    pub interactive: u64,
    /// Accepted into the replay queue
    pub queued: u64,
    /// Handed to the dispatch sink (direct and replayed)
    pub dispatched: u64,
    /// Subset of `dispatched` that came from a replay
    pub replayed: u64,
    /// Never delivered
    pub dropped: u64,
    /// Subset of `dropped` lost to a full queue
    pub overflowed: u64,
    /// Token refreshes forwarded
    pub tokens: u64,
    /// Messages currently queued
    pub pending: usize,
    pub state: ReadinessState,
}

impl RelayStatistics {
    /// Fraction of received messages that were delivered somewhere
    pub fn delivery_rate(&self) -> f64 {
        if self.received == 0 {
            0.0
        } else {
            (self.dispatched + self.interactive) as f64 / self.received as f64
        }
    }
}

// ----------------------------------------------------------------------------
// Relay Core
// ----------------------------------------------------------------------------

/// Foreground-aware message relay with deferred replay
///
/// One instance per process, shared behind an `Arc`. Construct it with
/// [`RelayBuilder`](crate::RelayBuilder).
pub struct RelayCore {
    config: RelayConfig,
    probe: Arc<dyn ForegroundProbe>,
    readiness: ConsumerReadiness,
    queue: ReplayQueue,
    handles: HandleRegistry,
    resolver: Arc<dyn CallbackResolver>,
    notifier: Arc<dyn NotificationSink>,
    bootstrap: Arc<dyn EnvironmentBootstrap>,
    dispatch_sink: OnceLock<Arc<dyn DispatchSink>>,
    runtime: Option<Handle>,
    next_sequence: AtomicU64,
    counters: RelayCounters,
}

impl RelayCore {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        config: RelayConfig,
        probe: Arc<dyn ForegroundProbe>,
        handles: HandleRegistry,
        resolver: Arc<dyn CallbackResolver>,
        notifier: Arc<dyn NotificationSink>,
        bootstrap: Arc<dyn EnvironmentBootstrap>,
        dispatch_sink: Option<Arc<dyn DispatchSink>>,
        runtime: Option<Handle>,
    ) -> Self {
        let queue = ReplayQueue::new(config.queue.clone());
        let wired = OnceLock::new();
        if let Some(sink) = dispatch_sink {
            let _ = wired.set(sink);
        }
        Self {
            config,
            probe,
            readiness: ConsumerReadiness::new(),
            queue,
            handles,
            resolver,
            notifier,
            bootstrap,
            dispatch_sink: wired,
            runtime,
            next_sequence: AtomicU64::new(0),
            counters: RelayCounters::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Service creation hook: start the environment from the persisted dispatcher
    pub fn on_service_created(&self) -> Option<BootstrapTask> {
        if self.readiness.current_state() != ReadinessState::NotStarted {
            trace!("Background environment already {}", self.readiness.current_state());
            return None;
        }
        let dispatcher = self.handles.background_message_dispatcher();
        self.request_start(dispatcher)
    }

    /// `NotStarted → Starting` and spawn the host bootstrap
    ///
    /// Returns the spawned task for the single caller that started the
    /// environment. If the dispatcher cannot be resolved the gate stays in
    /// `Starting` for the rest of the process and messages keep queuing.
    pub fn request_start(&self, dispatcher: CallbackHandle) -> Option<BootstrapTask> {
        if !self.readiness.begin_start() {
            debug!(
                "Ignoring start request, environment is {}",
                self.readiness.current_state()
            );
            return None;
        }

        let Some(entry) = self.resolver.lookup(dispatcher) else {
            error!(
                "Fatal: failed to find bootstrap callback for handle {}",
                dispatcher
            );
            return None;
        };

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            error!("Fatal: no async runtime available to bootstrap the background environment");
            return None;
        };

        info!(
            "Starting background environment via {} ({})",
            entry.name, entry.library_path
        );
        let bootstrap = self.bootstrap.clone();
        let request = BootstrapRequest { dispatcher, entry };
        Some(runtime.spawn(async move {
            match bootstrap.launch(request).await {
                Ok(()) => {
                    debug!("Background environment launched, awaiting readiness");
                    Ok(())
                }
                Err(err) => {
                    error!("Fatal: background environment bootstrap failed: {:#}", err);
                    Err(RelayError::Bootstrap(err))
                }
            }
        }))
    }

    /// Wire the background dispatch channel; only the first call wins
    pub fn wire_dispatch_sink(&self, sink: Arc<dyn DispatchSink>) -> bool {
        let wired = self.dispatch_sink.set(sink).is_ok();
        if !wired {
            warn!("Dispatch channel already wired, ignoring");
        }
        wired
    }

    pub fn is_dispatch_wired(&self) -> bool {
        self.dispatch_sink.get().is_some()
    }

    /// Environment reports ready: mark the gate and replay the queue in order
    ///
    /// Returns the number of messages replayed by this call. Only the first
    /// call can find anything to replay.
    pub fn on_ready(&self) -> usize {
        if self.readiness.mark_ready() {
            info!("Background environment ready");
        } else {
            debug!("Background environment already ready");
        }

        let pending = self.queue.drain_all();
        let count = pending.len();
        if count > 0 {
            info!("Replaying {} queued message(s)", count);
        }
        for message in pending {
            if self.deliver(message) == Route::Dispatched {
                bump(&self.counters.replayed);
            }
        }
        count
    }

    /// Resolve once the environment is ready
    pub async fn wait_ready(&self) {
        self.readiness.wait_ready().await
    }

    // ------------------------------------------------------------------------
    // Vendor SDK Events
    // ------------------------------------------------------------------------

    /// Route one inbound push message
    pub fn on_message(&self, remote: RemoteMessage) -> Route {
        if !remote.has_payload() {
            trace!("Ignoring message without payload");
            bump(&self.counters.ignored);
            return Route::Ignored;
        }
        bump(&self.counters.received);

        if self.probe.is_interactive_consumer_active() {
            self.notifier
                .notify(Notification::DataMessage { data: remote.data });
            bump(&self.counters.interactive);
            debug!("Message data received");
            return Route::Interactive;
        }

        // Sequence numbers are taken under the queue lock and follow queue order
        let data = remote.data;
        let message = || {
            let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
            Message::new(sequence, data)
        };

        match self
            .queue
            .enqueue_unless_with(message, || self.readiness.is_ready())
        {
            Enqueue::Queued => {
                trace!("Queued message until environment is ready");
                bump(&self.counters.queued);
                Route::Queued
            }
            Enqueue::QueuedEvicting(evicted) => {
                bump(&self.counters.queued);
                bump(&self.counters.overflowed);
                bump(&self.counters.dropped);
                debug!("Message #{} evicted from replay queue", evicted.sequence());
                Route::Queued
            }
            Enqueue::Rejected(rejected) => {
                let err = RelayError::QueueFull {
                    capacity: self.queue.capacity().unwrap_or(0),
                };
                warn!("Dropping message #{}: {}", rejected.sequence(), err);
                bump(&self.counters.overflowed);
                bump(&self.counters.dropped);
                Route::Dropped
            }
            Enqueue::Bypassed(message) => self.deliver(message),
        }
    }

    /// Forward a new push token; never gated
    pub fn on_token_refresh<T: Into<String>>(&self, token: T) {
        debug!("Token received");
        bump(&self.counters.tokens);
        self.notifier.notify(Notification::NewToken {
            token: token.into(),
        });
    }

    /// Forward an upstream send receipt
    pub fn on_message_sent<T: Into<String>>(&self, message_id: T) {
        self.notifier.notify(Notification::MessageSent {
            message_id: message_id.into(),
        });
    }

    /// Forward an upstream send failure
    pub fn on_send_error<T: Into<String>, R: Into<String>>(&self, message_id: T, reason: R) {
        let message_id = message_id.into();
        let reason = reason.into();
        warn!("Upstream send of {} failed: {}", message_id, reason);
        self.notifier
            .notify(Notification::SendError { message_id, reason });
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    fn deliver(&self, message: Message) -> Route {
        match self.try_dispatch(&message) {
            Ok(()) => {
                bump(&self.counters.dispatched);
                Route::Dispatched
            }
            Err(err) => {
                error!("Fatal: dropping message #{}: {}", message.sequence(), err);
                bump(&self.counters.dropped);
                Route::Dropped
            }
        }
    }

    fn try_dispatch(&self, message: &Message) -> RelayResult<()> {
        let sink = self
            .dispatch_sink
            .get()
            .ok_or(RelayError::ChannelNotWired)?;
        let handle = self.handles.require_background_message_handle()?;
        if self.resolver.lookup(handle).is_none() {
            return Err(RelayError::CallbackNotFound { handle });
        }
        sink.dispatch(handle, message);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Persisted callback handles
    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    pub fn readiness_state(&self) -> ReadinessState {
        self.readiness.current_state()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn statistics(&self) -> RelayStatistics {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let counters = &self.counters;
        RelayStatistics {
            received: load(&counters.received),
            ignored: load(&counters.ignored),
            interactive: load(&counters.interactive),
            queued: load(&counters.queued),
            dispatched: load(&counters.dispatched),
            replayed: load(&counters.replayed),
            dropped: load(&counters.dropped),
            overflowed: load(&counters.overflowed),
            tokens: load(&counters.tokens),
            pending: self.queue.len(),
            state: self.readiness.current_state(),
        }
    }
}

impl std::fmt::Debug for RelayCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayCore")
            .field("state", &self.readiness.current_state())
            .field("pending", &self.queue.len())
            .field("wired", &self.is_dispatch_wired())
            .finish()
    }
}
