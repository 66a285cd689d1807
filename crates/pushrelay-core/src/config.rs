//! Relay Configuration
//!
//! Queue bounds and the settings layout used to persist callback handles.

use crate::errors::{RelayError, RelayResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ----------------------------------------------------------------------------
// Queue Configuration
// ----------------------------------------------------------------------------

/// What the replay queue does when a bounded queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued message to make room
    #[default]
    DropOldest,
    /// Refuse the incoming message
    Reject,
}

/// Configuration for the replay queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum queued messages; `None` leaves the queue unbounded
    pub capacity: Option<usize>,
    /// Applied only when `capacity` is set
    pub overflow: OverflowPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            overflow: OverflowPolicy::DropOldest,
        }
    }
}

impl QueueConfig {
    /// Bounded queue with the given overflow policy
    pub fn bounded(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            capacity: Some(capacity),
            overflow,
        }
    }
}

// ----------------------------------------------------------------------------
// Settings Configuration
// ----------------------------------------------------------------------------

/// Where callback handles live in settings storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Namespace all relay entries are stored under
    pub namespace: String,
    /// Key of the per-message callback handle
    pub callback_key: String,
    /// Key of the environment bootstrap (dispatcher) handle
    pub dispatcher_key: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            namespace: "pushrelay.background".to_string(),
            callback_key: "background_message_callback".to_string(),
            dispatcher_key: "background_message_dispatcher".to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Relay Configuration
// ----------------------------------------------------------------------------

/// Top-level relay configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub queue: QueueConfig,
    pub settings: SettingsConfig,
}

impl RelayConfig {
    /// Default configuration with a bounded drop-oldest queue
    pub fn bounded(capacity: usize) -> Self {
        Self {
            queue: QueueConfig::bounded(capacity, OverflowPolicy::DropOldest),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> RelayResult<Self> {
        let config: RelayConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> RelayResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check the configuration for values the relay cannot work with
    pub fn validate(&self) -> RelayResult<()> {
        if self.queue.capacity == Some(0) {
            return Err(RelayError::config_error("queue capacity must be non-zero"));
        }
        let settings = &self.settings;
        if settings.namespace.is_empty() {
            return Err(RelayError::config_error("settings namespace is empty"));
        }
        if settings.callback_key.is_empty() || settings.dispatcher_key.is_empty() {
            return Err(RelayError::config_error("settings keys must be non-empty"));
        }
        if settings.callback_key == settings.dispatcher_key {
            return Err(RelayError::config_error(
                "callback and dispatcher keys must differ",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_settings_layout() {
        let config = RelayConfig::default();
        assert_eq!(config.queue.capacity, None);
        assert_eq!(config.settings.callback_key, "background_message_callback");
        assert_eq!(config.settings.dispatcher_key, "background_message_dispatcher");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            RelayConfig::from_json_str(r#"{"queue": {"capacity": 16, "overflow": "reject"}}"#)
                .unwrap();
        assert_eq!(config.queue, QueueConfig::bounded(16, OverflowPolicy::Reject));
        assert_eq!(config.settings, SettingsConfig::default());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = RelayConfig::from_json_str(r#"{"queue": {"capacity": 0, "overflow": "reject"}}"#)
            .unwrap_err();
        assert!(matches!(err, RelayError::Configuration { .. }));
    }

    #[test]
    fn test_clashing_keys_rejected() {
        let mut config = RelayConfig::bounded(4);
        config.settings.dispatcher_key = config.settings.callback_key.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path =
            std::env::temp_dir().join(format!("pushrelay-config-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"queue": {"capacity": 32}, "settings": {"namespace": "app.push"}}"#,
        )
        .unwrap();

        let config = RelayConfig::from_file(&path).unwrap();
        assert_eq!(config.queue, QueueConfig::bounded(32, OverflowPolicy::DropOldest));
        assert_eq!(config.settings.namespace, "app.push");
        assert_eq!(config.settings.callback_key, "background_message_callback");

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(RelayConfig::from_file(&path), Err(RelayError::Io(_))));
    }

    #[test]
    fn test_malformed_json() {
        let err = RelayConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, RelayError::Serialization(_)));
    }
}
