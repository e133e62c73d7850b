//! Typing Notifier
//!
//! Ephemeral typing-state fan-out. Nothing is persisted and nothing is
//! guaranteed; a dropped event self-heals on the next start/stop.

use std::sync::Arc;

use crate::shared::error::AppError;

use super::events::ServerEvent;
use super::hub::RoomHub;
use super::session::ConnectedSession;

pub struct TypingNotifier {
    hub: Arc<RoomHub>,
}

impl TypingNotifier {
    pub fn new(hub: Arc<RoomHub>) -> Self {
        Self { hub }
    }

    /// Broadcast typing state to all other members of the room.
    pub fn start(&self, session: &Arc<ConnectedSession>, room_id: i64) -> Result<(), AppError> {
        self.check(session, room_id)?;
        self.hub.send_to_room_except_user(
            room_id,
            session.user_id(),
            &ServerEvent::UserTyping {
                room_id,
                user_id: session.user_id(),
                username: session.user.username.clone(),
            },
        );
        Ok(())
    }

    pub fn stop(&self, session: &Arc<ConnectedSession>, room_id: i64) -> Result<(), AppError> {
        self.check(session, room_id)?;
        self.hub.send_to_room_except_user(
            room_id,
            session.user_id(),
            &ServerEvent::UserStoppedTyping {
                room_id,
                user_id: session.user_id(),
            },
        );
        Ok(())
    }

    fn check(&self, session: &Arc<ConnectedSession>, room_id: i64) -> Result<(), AppError> {
        if !self.hub.is_subscribed(&session.id, room_id) {
            return Err(AppError::AccessDenied("Access denied to this room".into()));
        }
        Ok(())
    }
}
