//! Message entity and message store trait.
//!
//! Maps to the `messages` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Message kinds matching the `message_type` column constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// A plain text message
    #[default]
    Text,
    /// An image with a stored file reference
    Image,
    /// An arbitrary file with a stored file reference
    File,
    /// A voice note with a stored file reference
    Audio,
}

impl MessageKind {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "image" => Self::Image,
            "file" => Self::File,
            "audio" => Self::Audio,
            _ => Self::Text,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::File => "file",
            Self::Audio => "audio",
        }
    }

    /// File-backed kinds require a file reference on send.
    pub fn requires_file(&self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a persisted message in a room.
///
/// Immutable after append except for the read flag.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (snowflake, assigned at append)
/// - room_id: BIGINT NOT NULL REFERENCES chat_rooms(id)
/// - sender_id: BIGINT NOT NULL REFERENCES users(id)
/// - message_text: TEXT NOT NULL DEFAULT ''
/// - message_type: VARCHAR(10) NOT NULL DEFAULT 'text'
/// - file_url: TEXT NULL
/// - file_name: VARCHAR(255) NULL
/// - file_size: BIGINT NULL
/// - quoted_message_id: BIGINT NULL REFERENCES messages(id)
/// - is_read: BOOLEAN NOT NULL DEFAULT FALSE
/// - created_at: TIMESTAMPTZ NOT NULL -- server-assigned ordering key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake ID (primary key), assigned by the store at append
    pub id: i64,

    /// Room the message belongs to
    pub room_id: i64,

    /// Author; always one of the room's two participants
    pub sender_id: i64,

    /// Body text; empty for pure file messages
    pub body: String,

    /// Kind of message
    #[serde(rename = "kind")]
    pub kind: MessageKind,

    /// Stored file reference for file-backed kinds
    pub file_url: Option<String>,

    /// Original file name
    pub file_name: Option<String>,

    /// File size in bytes
    pub file_size: Option<i64>,

    /// ID of the quoted message; always references a message in the same room
    pub quoted_id: Option<i64>,

    /// True once at least one read receipt exists
    pub read: bool,

    /// Server-assigned timestamp; the ordering key for all consumers
    pub created_at: DateTime<Utc>,
}

/// A validated message draft handed to the store for append.
///
/// The store assigns the id and the server timestamp.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub room_id: i64,
    pub sender_id: i64,
    pub body: String,
    pub kind: MessageKind,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub quoted_id: Option<i64>,
}

/// Display projection of a quoted message, joined with its sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteView {
    pub id: i64,
    pub room_id: i64,
    pub body: String,
    pub kind: MessageKind,
    pub file_name: Option<String>,
    pub sender_id: i64,
    pub sender_username: String,
    pub sender_name: Option<String>,
}

/// Durable message storage consumed by the realtime core.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append a message, assigning its id and server timestamp.
    ///
    /// Within one room, the assigned timestamps are monotonically
    /// non-decreasing in append order.
    async fn append(&self, draft: &NewMessage) -> Result<Message, AppError>;

    /// The most recent `limit` messages of a room in chronological order.
    async fn recent(&self, room_id: i64, limit: i64) -> Result<Vec<Message>, AppError>;

    /// Look up a message by id.
    async fn fetch_by_id(&self, id: i64) -> Result<Option<Message>, AppError>;

    /// Display projection of a message for quoting, or None when absent.
    async fn quote_view(&self, id: i64) -> Result<Option<QuoteView>, AppError>;

    /// Flip the read flag for the given messages of a room.
    async fn set_read(&self, room_id: i64, message_ids: &[i64]) -> Result<(), AppError>;

    /// IDs of all unread messages in a room authored by someone other than
    /// `reader_id`, for mark-all-read.
    async fn unread_ids(&self, room_id: i64, reader_id: i64) -> Result<Vec<i64>, AppError>;

    /// Filter `candidates` down to messages that exist in the room and were
    /// not authored by `reader_id`. Self-reads are excluded here, by
    /// construction rather than by a rejected call.
    async fn readable_ids(
        &self,
        room_id: i64,
        reader_id: i64,
        candidates: &[i64],
    ) -> Result<Vec<i64>, AppError>;
}
