//! WebSocket Session
//!
//! One authenticated realtime connection bound to a user identity.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::User;

use super::events::ServerEvent;

/// Session identifier, unique per connection
pub type SessionId = String;

/// A live session with its outbound event sender.
///
/// The receiver half is drained by a forwarding task that writes to the
/// socket, so every fan-out is a non-blocking channel send.
pub struct ConnectedSession {
    pub id: SessionId,
    pub user: User,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectedSession {
    /// Create a session for `user`, returning the outbound receiver for the
    /// socket forwarding task.
    pub fn new(user: User) -> (std::sync::Arc<Self>, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = std::sync::Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            user,
            sender: tx,
        });
        (session, rx)
    }

    /// Queue an event for this session. Returns false when the connection is
    /// already gone; fan-out treats that as a no-op.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    pub fn user_id(&self) -> i64 {
        self.user.id
    }
}
