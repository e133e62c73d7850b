//! Push notification hand-off payload and sink trait.

use serde::{Deserialize, Serialize};

/// Payload handed to the push collaborator for an offline room participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// The offline recipient
    pub user_id: i64,
    /// The message that triggered the notification
    pub message_id: i64,
    pub room_id: i64,
    /// Display name of the sender
    pub sender_name: String,
    /// Truncated body or a kind placeholder for file messages
    pub preview: String,
}

/// Best-effort, fire-and-forget notification hand-off.
///
/// `notify` only enqueues; it never blocks the send path and its failure
/// never fails the triggering operation.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, payload: NotificationPayload);
}
