//! WebSocket Event Types
//!
//! The closed sets of client and server events exchanged over a session.
//! Client events are a tagged enum so each session's dispatch function can
//! match exhaustively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{Message, MessageKind, QuoteView, Room, User, UserRole};

/// Incoming events, one variant per supported operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom(RoomRef),
    SendMessage(SendMessagePayload),
    MarkMessagesRead(MarkReadPayload),
    TypingStart(RoomRef),
    TypingStop(RoomRef),
    GetMessageForQuote(QuoteRequest),
}

/// A bare room reference
#[derive(Debug, Clone, Deserialize)]
pub struct RoomRef {
    pub room_id: i64,
}

/// Payload for `send_message`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessagePayload {
    pub room_id: i64,

    /// Body text; required for `text`, optional caption otherwise
    #[validate(length(max = 4000, message = "must be at most 4000 characters"))]
    pub body: Option<String>,

    #[serde(default)]
    pub kind: MessageKind,

    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,

    /// Reply-style back-reference to a prior message in the same room
    pub quoted_id: Option<i64>,
}

/// Payload for `mark_messages_read`
#[derive(Debug, Clone, Deserialize)]
pub struct MarkReadPayload {
    pub room_id: i64,

    /// Explicit targets; when omitted, all unread messages authored by others
    pub message_ids: Option<Vec<i64>>,
}

/// Payload for `get_message_for_quote`
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub message_id: i64,
    pub room_id: i64,
}

/// Outgoing events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Ready {
        session_id: String,
        room_ids: Vec<i64>,
    },
    RoomJoined {
        room: Room,
        recent_messages: Vec<MessageView>,
    },
    NewMessage(MessageView),
    MessagesRead {
        room_id: i64,
        user_id: i64,
        username: String,
        message_ids: Vec<i64>,
    },
    UserTyping {
        room_id: i64,
        user_id: i64,
        username: String,
    },
    UserStoppedTyping {
        room_id: i64,
        user_id: i64,
    },
    UserOnline {
        user_id: i64,
        username: String,
    },
    UserOffline {
        user_id: i64,
        username: String,
    },
    MessageForQuote(QuoteView),
    Error {
        message: String,
    },
}

/// A message hydrated with sender display fields for broadcast and replay.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub sender_username: String,
    pub sender_name: Option<String>,
    pub sender_avatar: Option<String>,
    pub sender_role: UserRole,
    pub body: String,
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_id: Option<i64>,
    /// Hydrated quote details; present on live `new_message` broadcasts only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted: Option<QuoteView>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl MessageView {
    /// Hydrate a freshly appended message with its live sender.
    pub fn hydrate(message: Message, sender: &User, quoted: Option<QuoteView>) -> Self {
        Self {
            id: message.id,
            room_id: message.room_id,
            sender_id: message.sender_id,
            sender_username: sender.username.clone(),
            sender_name: sender.full_name.clone(),
            sender_avatar: sender.avatar_url.clone(),
            sender_role: sender.role,
            body: message.body,
            kind: message.kind,
            file_url: message.file_url,
            file_name: message.file_name,
            file_size: message.file_size,
            quoted_id: message.quoted_id,
            quoted,
            read: message.read,
            created_at: message.created_at,
        }
    }

    /// Hydrate a backlog message from the room's participant display fields.
    ///
    /// The sender of any stored message is one of the room's two members, so
    /// the role falls out of which side matches.
    pub fn from_backlog(message: Message, room: &Room) -> Self {
        let (username, name, avatar) = room
            .participant_display(message.sender_id)
            .map(|(u, n, a)| (u.to_string(), n.map(str::to_string), a.map(str::to_string)))
            .unwrap_or_default();
        let role = if message.sender_id == room.client_id {
            UserRole::Client
        } else {
            UserRole::Technician
        };
        Self {
            id: message.id,
            room_id: message.room_id,
            sender_id: message.sender_id,
            sender_username: username,
            sender_name: name,
            sender_avatar: avatar,
            sender_role: role,
            body: message.body,
            kind: message.kind,
            file_url: message.file_url,
            file_name: message.file_name,
            file_size: message.file_size,
            quoted_id: message.quoted_id,
            quoted: None,
            read: message.read,
            created_at: message.created_at,
        }
    }
}
