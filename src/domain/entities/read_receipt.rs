//! Read receipt entity and store trait.
//!
//! Maps to the `message_reads` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A record that a specific user has seen a specific message.
///
/// At most one receipt exists per (message, reader) pair, and the reader is
/// never the message's author.
///
/// Maps to the `message_reads` table:
/// - message_id: BIGINT NOT NULL REFERENCES messages(id)
/// - user_id: BIGINT NOT NULL REFERENCES users(id)
/// - read_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - PRIMARY KEY (message_id, user_id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub message_id: i64,
    pub reader_id: i64,
    pub read_at: DateTime<Utc>,
}

/// Idempotent receipt storage consumed by the read-receipt tracker.
#[async_trait]
pub trait ReadReceiptStore: Send + Sync {
    /// Insert a receipt unless one already exists for the pair.
    ///
    /// Returns `true` when a new receipt was created, `false` when the pair
    /// was already recorded. Duplicates are silent no-ops, never errors.
    async fn insert_if_absent(&self, message_id: i64, reader_id: i64) -> Result<bool, AppError>;
}
