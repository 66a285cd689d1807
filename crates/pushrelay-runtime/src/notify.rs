//! Ungated notification path
//!
//! Tokens, send receipts and data messages for an interactive consumer are
//! delivered here immediately, independent of the background environment.

use pushrelay_core::Notification;
use tokio::sync::mpsc;
use tracing::warn;

/// Receives notifications for the interactive side of the host
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

pub type NotificationSender = mpsc::UnboundedSender<Notification>;
pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

/// Notification sink backed by an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: NotificationSender,
}

impl ChannelNotifier {
    pub fn new(sender: NotificationSender) -> Self {
        Self { sender }
    }
}

impl NotificationSink for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            warn!("Notification receiver dropped, notification discarded");
        }
    }
}

/// Create a notifier and the receiver the host reads notifications from
pub fn create_notification_channel() -> (ChannelNotifier, NotificationReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ChannelNotifier::new(sender), receiver)
}
