//! Core types for the push relay
//!
//! Messages, callback handles and the readiness vocabulary shared by the core
//! components and the runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

// ----------------------------------------------------------------------------
// Callback Handle
// ----------------------------------------------------------------------------

/// Opaque 64-bit identifier of a host entry point
///
/// Handles are persisted in settings storage by the host and resolved back to
/// an entry point at dispatch time. Zero means "never registered".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackHandle(i64);

impl CallbackHandle {
    /// The unset handle (settings default)
    pub const UNSET: CallbackHandle = CallbackHandle(0);

    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> i64 {
        self.0
    }

    /// Whether this handle was ever registered
    pub fn is_unset(&self) -> bool {
        self.0 == 0
    }
}

impl From<i64> for CallbackHandle {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Messages
// ----------------------------------------------------------------------------

/// Inbound push event as handed over by the vendor SDK
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMessage {
    /// Vendor message identifier, when the SDK provides one
    pub message_id: Option<String>,
    /// Serialized data payload (string-keyed mapping)
    pub data: String,
}

impl RemoteMessage {
    pub fn new<T: Into<String>>(data: T) -> Self {
        Self {
            message_id: None,
            data: data.into(),
        }
    }

    pub fn with_message_id<T: Into<String>>(mut self, message_id: T) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Empty payloads are not relayed
    pub fn has_payload(&self) -> bool {
        !self.data.is_empty()
    }
}

/// A relayed message: payload plus its arrival order
///
/// Immutable once created. Owned by the replay queue until dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    sequence: u64,
    payload: String,
}

impl Message {
    pub fn new<T: Into<String>>(sequence: u64, payload: T) -> Self {
        Self {
            sequence,
            payload: payload.into(),
        }
    }

    /// Arrival order assigned by the relay
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn into_payload(self) -> String {
        self.payload
    }
}

// ----------------------------------------------------------------------------
// Readiness State
// ----------------------------------------------------------------------------

/// Lifecycle of the background execution environment
///
/// Monotonic within a process: `NotStarted → Starting → Ready`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum ReadinessState {
    #[default]
    NotStarted = 0,
    Starting = 1,
    Ready = 2,
}

impl ReadinessState {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ReadinessState::NotStarted,
            1 => ReadinessState::Starting,
            _ => ReadinessState::Ready,
        }
    }
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessState::NotStarted => write!(f, "NotStarted"),
            ReadinessState::Starting => write!(f, "Starting"),
            ReadinessState::Ready => write!(f, "Ready"),
        }
    }
}

// ----------------------------------------------------------------------------
// Notifications
// ----------------------------------------------------------------------------

/// Events delivered on the ungated notification path
///
/// This path is independent of readiness: tokens, send receipts and data
/// messages for an interactive consumer all go through here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// The vendor SDK issued a new push token
    NewToken { token: String },
    /// A data message for the interactive consumer
    DataMessage { data: String },
    /// An upstream message was sent
    MessageSent { message_id: String },
    /// An upstream message failed to send
    SendError { message_id: String, reason: String },
}
