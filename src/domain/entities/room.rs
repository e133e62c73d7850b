//! Room entity and room authorization trait.
//!
//! Maps to the `chat_rooms` table, hydrated with participant and task display
//! fields the way the room queries join them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A fixed client-technician-task conversation channel.
///
/// Membership (client_id, technician_id) is immutable once created. Rooms are
/// created or reactivated by the external task workflow, never by the realtime
/// core; a room is unique over the (client, technician, task) triple.
///
/// Maps to the `chat_rooms` table:
/// - id: BIGINT PRIMARY KEY
/// - client_id: BIGINT NOT NULL REFERENCES users(id)
/// - technician_id: BIGINT NOT NULL REFERENCES users(id)
/// - task_id: BIGINT NOT NULL REFERENCES tasks(id)
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
/// - last_message_at: TIMESTAMPTZ NULL
/// - UNIQUE (client_id, technician_id, task_id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Primary key
    pub id: i64,

    /// The client participant
    pub client_id: i64,

    /// The technician participant
    pub technician_id: i64,

    /// The task this room is scoped to
    pub task_id: i64,

    /// Whether the room currently accepts traffic
    pub active: bool,

    /// Timestamp of the most recent message
    pub last_message_at: Option<DateTime<Utc>>,

    // Display fields joined from users and tasks
    pub client_username: String,
    pub client_name: Option<String>,
    pub client_avatar: Option<String>,
    pub technician_username: String,
    pub technician_name: Option<String>,
    pub technician_avatar: Option<String>,
    pub task_name: String,
}

impl Room {
    /// A session may subscribe only where its user is the client or the
    /// technician of the room.
    pub fn is_participant(&self, user_id: i64) -> bool {
        self.client_id == user_id || self.technician_id == user_id
    }

    /// The other participant relative to `user_id`, if `user_id` is a member.
    pub fn other_participant(&self, user_id: i64) -> Option<i64> {
        if self.client_id == user_id {
            Some(self.technician_id)
        } else if self.technician_id == user_id {
            Some(self.client_id)
        } else {
            None
        }
    }

    /// Display fields (username, full name, avatar) for a participant.
    pub fn participant_display(&self, user_id: i64) -> Option<(&str, Option<&str>, Option<&str>)> {
        if self.client_id == user_id {
            Some((
                &self.client_username,
                self.client_name.as_deref(),
                self.client_avatar.as_deref(),
            ))
        } else if self.technician_id == user_id {
            Some((
                &self.technician_username,
                self.technician_name.as_deref(),
                self.technician_avatar.as_deref(),
            ))
        } else {
            None
        }
    }
}

/// Room authorization source consumed by the realtime core.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// All active rooms where the user is the client or the technician.
    async fn rooms_of(&self, user_id: i64) -> Result<Vec<Room>, AppError>;

    /// Look up a single room with its display fields.
    async fn find_by_id(&self, room_id: i64) -> Result<Option<Room>, AppError>;
}
