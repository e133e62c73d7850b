//! Read-Receipt Tracker
//!
//! Records per-user-per-message read events idempotently and reports
//! consolidated status to the room.

use std::sync::Arc;

use crate::domain::{MessageStore, ReadReceiptStore};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

use super::events::{MarkReadPayload, ServerEvent};
use super::hub::RoomHub;
use super::session::ConnectedSession;

pub struct ReadReceiptTracker {
    hub: Arc<RoomHub>,
    messages: Arc<dyn MessageStore>,
    receipts: Arc<dyn ReadReceiptStore>,
}

impl ReadReceiptTracker {
    pub fn new(
        hub: Arc<RoomHub>,
        messages: Arc<dyn MessageStore>,
        receipts: Arc<dyn ReadReceiptStore>,
    ) -> Self {
        Self {
            hub,
            messages,
            receipts,
        }
    }

    /// Record read receipts for the targeted messages and broadcast the
    /// consolidated `messages_read` event.
    ///
    /// Targets are the explicit ids filtered to this room, or every unread
    /// message authored by others when no ids are given. The caller's own
    /// messages are excluded from the target set by construction, so a
    /// self-read can never produce a receipt. Duplicate marks are silent
    /// no-ops. Returns the targeted ids.
    pub async fn mark_read(
        &self,
        session: &Arc<ConnectedSession>,
        payload: MarkReadPayload,
    ) -> Result<Vec<i64>, AppError> {
        let room_id = payload.room_id;
        let reader_id = session.user_id();

        if !self.hub.is_subscribed(&session.id, room_id) {
            return Err(AppError::AccessDenied("Access denied to this room".into()));
        }

        let targets = match payload.message_ids {
            Some(ids) => self.messages.readable_ids(room_id, reader_id, &ids).await?,
            None => self.messages.unread_ids(room_id, reader_id).await?,
        };

        if targets.is_empty() {
            return Ok(targets);
        }

        for message_id in &targets {
            if self.receipts.insert_if_absent(*message_id, reader_id).await? {
                metrics::RECEIPTS_RECORDED.inc();
            }
        }
        self.messages.set_read(room_id, &targets).await?;

        // The caller's own other sessions receive this too, for UI sync.
        self.hub.send_to_room_except_session(
            room_id,
            &session.id,
            &ServerEvent::MessagesRead {
                room_id,
                user_id: reader_id,
                username: session.user.username.clone(),
                message_ids: targets.clone(),
            },
        );

        tracing::debug!(
            room_id = room_id,
            reader_id = reader_id,
            count = targets.len(),
            "Messages marked read"
        );

        Ok(targets)
    }
}
