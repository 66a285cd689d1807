//! Error types for the push relay
//!
//! Every failure the relay can detect is represented here. The relay entry
//! points never surface these to the vendor SDK; they are logged and counted at
//! the point of detection. Lower-level components (settings stores, the replay
//! queue, configuration loading) return them through `RelayResult`.

use crate::types::CallbackHandle;

// ----------------------------------------------------------------------------
// Relay Error
// ----------------------------------------------------------------------------

/// Core error type for the push relay
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A persisted callback handle was absent or zero
    #[error("Callback handle '{key}' is not set")]
    HandleUnset { key: String },

    /// A callback handle could not be resolved to a host entry point
    #[error("Failed to find callback for handle {handle}")]
    CallbackNotFound { handle: CallbackHandle },

    /// The background dispatch channel has not been wired yet
    #[error("Background dispatch channel is not wired")]
    ChannelNotWired,

    /// A bounded replay queue had no room for a message
    #[error("Replay queue is full (capacity: {capacity})")]
    QueueFull { capacity: usize },

    /// Settings storage failure
    #[error("Settings error: {reason}")]
    Settings { reason: String },

    /// Invalid configuration
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// The host environment bootstrap failed
    #[error("Environment bootstrap failed: {0}")]
    Bootstrap(#[source] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl RelayError {
    /// Create a handle-unset error for the given settings key
    pub fn handle_unset<T: Into<String>>(key: T) -> Self {
        RelayError::HandleUnset { key: key.into() }
    }

    /// Create a settings error with a reason
    pub fn settings_error<T: Into<String>>(reason: T) -> Self {
        RelayError::Settings {
            reason: reason.into(),
        }
    }

    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        RelayError::Configuration {
            reason: reason.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, RelayError>;
pub type RelayResult<T> = Result<T>;
