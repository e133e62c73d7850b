//! Room Membership Operations
//!
//! Explicit join with backlog replay, plus the admission-time
//! resolve-and-subscribe-all step.

use std::sync::Arc;

use crate::domain::{MessageStore, Room, RoomDirectory};
use crate::shared::error::AppError;

use super::events::MessageView;
use super::hub::RoomHub;
use super::session::ConnectedSession;

/// Governs join/leave against the room authorization source.
pub struct RoomService {
    hub: Arc<RoomHub>,
    rooms: Arc<dyn RoomDirectory>,
    messages: Arc<dyn MessageStore>,
    backlog_limit: i64,
}

impl RoomService {
    pub fn new(
        hub: Arc<RoomHub>,
        rooms: Arc<dyn RoomDirectory>,
        messages: Arc<dyn MessageStore>,
        backlog_limit: i64,
    ) -> Self {
        Self {
            hub,
            rooms,
            messages,
            backlog_limit,
        }
    }

    /// Subscribe a newly admitted session to every room its user
    /// participates in, returning the subscribed set for the `ready` event.
    ///
    /// No backlog is pushed here; clients pull it per room via `join_room`.
    pub async fn resolve_and_subscribe_all(
        &self,
        session: &Arc<ConnectedSession>,
    ) -> Result<Vec<Room>, AppError> {
        let rooms = self.rooms.rooms_of(session.user_id()).await?;
        for room in &rooms {
            self.hub.subscribe(&session.id, room.id);
        }
        Ok(rooms)
    }

    /// Explicit join: verify membership, subscribe (idempotently), and return
    /// the room snapshot with its recent backlog in chronological order.
    ///
    /// Joining does not touch read state; reads require an explicit
    /// `mark_messages_read`.
    pub async fn join(
        &self,
        session: &Arc<ConnectedSession>,
        room_id: i64,
    ) -> Result<(Room, Vec<MessageView>), AppError> {
        let room = self
            .rooms
            .find_by_id(room_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Room not found".into()))?;

        if !room.is_participant(session.user_id()) {
            return Err(AppError::AccessDenied("Access denied to this room".into()));
        }

        self.hub.subscribe(&session.id, room_id);

        let backlog = self
            .messages
            .recent(room_id, self.backlog_limit)
            .await?
            .into_iter()
            .map(|m| MessageView::from_backlog(m, &room))
            .collect();

        tracing::debug!(
            user_id = session.user_id(),
            room_id = room_id,
            "Session joined room"
        );

        Ok((room, backlog))
    }

    /// Drop one subscription. Used implicitly for every room on disconnect.
    pub fn leave(&self, session: &Arc<ConnectedSession>, room_id: i64) {
        self.hub.unsubscribe(&session.id, room_id);
    }
}
