//! Push Relay Core
//!
//! Leaf components of the foreground-aware push message relay:
//! - `ForegroundProbe`: is an interactive consumer present?
//! - `ReplayQueue`: ordered buffer of messages awaiting the background environment
//! - `ConsumerReadiness`: `NotStarted → Starting → Ready` gate with wait/notify
//! - `HandleRegistry`: persisted callback handles on top of a `SettingsStore`
//!
//! Orchestration lives in `pushrelay-runtime`.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod errors;
pub mod probe;
pub mod queue;
pub mod readiness;
pub mod settings;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{OverflowPolicy, QueueConfig, RelayConfig, SettingsConfig};
pub use errors::{RelayError, RelayResult, Result};
pub use probe::{
    ForegroundProbe, Importance, LockState, NeverLocked, ProcessInfo, ProcessProbe, ProcessTable,
    ProcfsTable, StaticProbe,
};
pub use queue::{Enqueue, ReplayQueue};
pub use readiness::ConsumerReadiness;
pub use settings::{HandleRegistry, JsonFileSettings, MemorySettings, SettingsStore};
pub use types::{CallbackHandle, Message, Notification, ReadinessState, RemoteMessage};
