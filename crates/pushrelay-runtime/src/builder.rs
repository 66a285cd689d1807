//! Relay Builder API
//!
//! Assembles a `RelayCore` from its collaborators. Everything except the
//! notification sink has a default, so hosts only wire what they own.

use std::sync::Arc;

use pushrelay_core::{
    ForegroundProbe, HandleRegistry, MemorySettings, ProcessProbe, QueueConfig, RelayConfig,
    RelayError, RelayResult, SettingsStore,
};
use tokio::runtime::Handle;
use tracing::info;

use crate::bootstrap::{EnvironmentBootstrap, ExternalBootstrap};
use crate::callback::{CallbackRegistry, CallbackResolver};
use crate::notify::NotificationSink;
use crate::relay::RelayCore;
use crate::sink::DispatchSink;

// ----------------------------------------------------------------------------
// Relay Builder
// ----------------------------------------------------------------------------

/// Builder for a process-wide relay instance
#[derive(Default)]
pub struct RelayBuilder {
    config: RelayConfig,
    probe: Option<Arc<dyn ForegroundProbe>>,
    settings: Option<Arc<dyn SettingsStore>>,
    resolver: Option<Arc<dyn CallbackResolver>>,
    notifier: Option<Arc<dyn NotificationSink>>,
    bootstrap: Option<Arc<dyn EnvironmentBootstrap>>,
    dispatch_sink: Option<Arc<dyn DispatchSink>>,
    runtime: Option<Handle>,
}

impl RelayBuilder {
    /// Create a new relay builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the relay configuration
    pub fn with_config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Override only the replay queue configuration
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.config.queue = queue;
        self
    }

    /// Foreground probe (default: `ProcessProbe::native()`)
    pub fn with_probe(mut self, probe: Arc<dyn ForegroundProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Settings store holding the callback handles (default: in-memory)
    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Callback resolver (default: empty `CallbackRegistry`)
    pub fn with_resolver(mut self, resolver: Arc<dyn CallbackResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Notification sink for tokens and interactive messages (required)
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Environment bootstrap (default: `ExternalBootstrap`)
    pub fn with_bootstrap(mut self, bootstrap: Arc<dyn EnvironmentBootstrap>) -> Self {
        self.bootstrap = Some(bootstrap);
        self
    }

    /// Wire the dispatch channel up front instead of via `wire_dispatch_sink`
    pub fn with_dispatch_sink(mut self, sink: Arc<dyn DispatchSink>) -> Self {
        self.dispatch_sink = Some(sink);
        self
    }

    /// Runtime the bootstrap task is spawned on (default: the caller's runtime)
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Validate the configuration and assemble the relay
    pub fn build(self) -> RelayResult<Arc<RelayCore>> {
        self.config.validate()?;

        let notifier = self
            .notifier
            .ok_or_else(|| RelayError::config_error("notification sink is required"))?;
        let probe = self
            .probe
            .unwrap_or_else(|| Arc::new(ProcessProbe::native()));
        let settings = self
            .settings
            .unwrap_or_else(|| Arc::new(MemorySettings::new()));
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(CallbackRegistry::new()));
        let bootstrap = self
            .bootstrap
            .unwrap_or_else(|| Arc::new(ExternalBootstrap));
        let handles = HandleRegistry::new(settings, self.config.settings.clone());

        info!(
            "Building push relay (queue capacity: {})",
            self.config
                .queue
                .capacity
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unbounded".to_string())
        );

        Ok(Arc::new(RelayCore::assemble(
            self.config,
            probe,
            handles,
            resolver,
            notifier,
            bootstrap,
            self.dispatch_sink,
            self.runtime,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::create_notification_channel;
    use pushrelay_core::{OverflowPolicy, ReadinessState};

    #[test]
    fn test_notifier_required() {
        let err = RelayBuilder::new().build().unwrap_err();
        assert!(matches!(err, RelayError::Configuration { .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (notifier, _rx) = create_notification_channel();
        let err = RelayBuilder::new()
            .with_notifier(Arc::new(notifier))
            .with_queue(QueueConfig::bounded(0, OverflowPolicy::Reject))
            .build()
            .unwrap_err();
        assert!(matches!(err, RelayError::Configuration { .. }));
    }

    #[test]
    fn test_defaults() {
        let (notifier, _rx) = create_notification_channel();
        let relay = RelayBuilder::new()
            .with_notifier(Arc::new(notifier))
            .build()
            .unwrap();
        assert_eq!(relay.readiness_state(), ReadinessState::NotStarted);
        assert!(!relay.is_dispatch_wired());
        assert_eq!(relay.pending(), 0);
        assert_eq!(relay.config().queue.capacity, None);
    }
}
