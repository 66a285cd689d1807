//! Push Relay Runtime
//!
//! This crate contains the orchestration side of the push relay:
//! - `RelayCore`: routes inbound push messages and replays deferred ones
//! - `DispatchSink` / `HostChannel`: hand messages to the host runtime
//! - `NotificationSink`: ungated path for tokens and interactive messages
//! - `EnvironmentBootstrap`: one-shot launch of the background environment
//!
//! `pushrelay-core` provides the queue, readiness gate, probe and settings
//! components this crate composes.

pub mod bootstrap;
pub mod builder;
pub mod callback;
pub mod notify;
pub mod relay;
pub mod sink;

pub use bootstrap::{BootstrapRequest, BootstrapTask, EnvironmentBootstrap, ExternalBootstrap};
pub use builder::RelayBuilder;
pub use callback::{CallbackInfo, CallbackRegistry, CallbackResolver};
pub use notify::{
    create_notification_channel, ChannelNotifier, NotificationReceiver, NotificationSender,
    NotificationSink,
};
pub use relay::{RelayCore, RelayStatistics, Route};
pub use sink::{
    create_host_channel, ChannelHost, DispatchSink, HostChannel, HostInvocation, HostReceiver,
    HostSender, MethodChannelSink, HANDLE_BACKGROUND_MESSAGE,
};

// Re-export core types for convenience
pub use pushrelay_core::{
    CallbackHandle, ConsumerReadiness, ForegroundProbe, HandleRegistry, JsonFileSettings,
    MemorySettings, Message, Notification, OverflowPolicy, ProcessProbe, QueueConfig,
    ReadinessState, RelayConfig, RelayError, RelayResult, RemoteMessage, ReplayQueue,
    SettingsConfig, SettingsStore, StaticProbe,
};
