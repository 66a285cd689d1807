//! Host dispatch
//!
//! The dispatch sink hands one message plus its callback handle to the host
//! runtime as a named method invocation. Delivery is fire-and-forget.

use pushrelay_core::{CallbackHandle, Message};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// Method the host runtime handles deferred messages under
pub const HANDLE_BACKGROUND_MESSAGE: &str = "handleBackgroundMessage";

// ----------------------------------------------------------------------------
// Host Channel
// ----------------------------------------------------------------------------

/// A method call into the host runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInvocation {
    pub method: String,
    pub arguments: Value,
}

impl HostInvocation {
    pub fn new<M: Into<String>>(method: M, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// `handleBackgroundMessage` with `{handle, message}`
    pub fn background_message(handle: CallbackHandle, message: &Message) -> Self {
        Self::new(
            HANDLE_BACKGROUND_MESSAGE,
            json!({
                "handle": handle.raw(),
                "message": message.payload(),
            }),
        )
    }

    pub fn handle(&self) -> Option<CallbackHandle> {
        self.arguments
            .get("handle")
            .and_then(Value::as_i64)
            .map(CallbackHandle::new)
    }

    pub fn message(&self) -> Option<&str> {
        self.arguments.get("message").and_then(Value::as_str)
    }
}

/// Method-call channel into the host runtime
pub trait HostChannel: Send + Sync {
    fn invoke_method(&self, invocation: HostInvocation);
}

pub type HostSender = mpsc::UnboundedSender<HostInvocation>;
pub type HostReceiver = mpsc::UnboundedReceiver<HostInvocation>;

/// Host channel backed by an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelHost {
    sender: HostSender,
}

impl ChannelHost {
    pub fn new(sender: HostSender) -> Self {
        Self { sender }
    }
}

impl HostChannel for ChannelHost {
    fn invoke_method(&self, invocation: HostInvocation) {
        trace!("Invoking host method {}", invocation.method);
        if self.sender.send(invocation).is_err() {
            warn!("Host channel closed, invocation discarded");
        }
    }
}

/// Create a host channel and the receiver the host reads invocations from
pub fn create_host_channel() -> (ChannelHost, HostReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ChannelHost::new(sender), receiver)
}

// ----------------------------------------------------------------------------
// Dispatch Sink
// ----------------------------------------------------------------------------

/// Delivers one message to the host's background handler
pub trait DispatchSink: Send + Sync {
    fn dispatch(&self, handle: CallbackHandle, message: &Message);
}

/// Dispatch sink that invokes `handleBackgroundMessage` on a host channel
#[derive(Debug, Clone)]
pub struct MethodChannelSink<C> {
    channel: C,
}

impl<C: HostChannel> MethodChannelSink<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }
}

impl<C: HostChannel> DispatchSink for MethodChannelSink<C> {
    fn dispatch(&self, handle: CallbackHandle, message: &Message) {
        self.channel
            .invoke_method(HostInvocation::background_message(handle, message));
    }
}
