//! Message Store Implementation
//!
//! PostgreSQL message persistence. Ids are snowflakes assigned here at
//! append, together with the server timestamp that orders every consumer.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Message, MessageKind, MessageStore, NewMessage, QuoteView};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// PostgreSQL-backed message store.
pub struct PgMessageStore {
    pool: PgPool,
    id_generator: Arc<SnowflakeGenerator>,
}

impl PgMessageStore {
    pub fn new(pool: PgPool, id_generator: Arc<SnowflakeGenerator>) -> Self {
        Self { pool, id_generator }
    }
}

/// Internal row type for message queries.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    room_id: i64,
    sender_id: i64,
    message_text: String,
    message_type: String,
    file_url: Option<String>,
    file_name: Option<String>,
    file_size: Option<i64>,
    quoted_message_id: Option<i64>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            room_id: self.room_id,
            sender_id: self.sender_id,
            body: self.message_text,
            kind: MessageKind::from_str(&self.message_type),
            file_url: self.file_url,
            file_name: self.file_name,
            file_size: self.file_size,
            quoted_id: self.quoted_message_id,
            read: self.is_read,
            created_at: self.created_at,
        }
    }
}

/// Internal row type for quote projections.
#[derive(Debug, sqlx::FromRow)]
struct QuoteRow {
    id: i64,
    room_id: i64,
    message_text: String,
    message_type: String,
    file_name: Option<String>,
    sender_id: i64,
    sender_username: String,
    sender_name: Option<String>,
}

impl QuoteRow {
    fn into_view(self) -> QuoteView {
        QuoteView {
            id: self.id,
            room_id: self.room_id,
            body: self.message_text,
            kind: MessageKind::from_str(&self.message_type),
            file_name: self.file_name,
            sender_id: self.sender_id,
            sender_username: self.sender_username,
            sender_name: self.sender_name,
        }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    /// Append a message and bump the room's last-message timestamp in one
    /// transaction.
    async fn append(&self, draft: &NewMessage) -> Result<Message, AppError> {
        let id = self.id_generator.generate();
        let created_at = Utc::now();

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (
                id, room_id, sender_id, message_text, message_type,
                file_url, file_name, file_size, quoted_message_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, room_id, sender_id, message_text, message_type,
                      file_url, file_name, file_size, quoted_message_id,
                      is_read, created_at
            "#,
        )
        .bind(id)
        .bind(draft.room_id)
        .bind(draft.sender_id)
        .bind(&draft.body)
        .bind(draft.kind.as_str())
        .bind(&draft.file_url)
        .bind(&draft.file_name)
        .bind(draft.file_size)
        .bind(draft.quoted_id)
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE chat_rooms SET last_message_at = $2 WHERE id = $1")
            .bind(draft.room_id)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row.into_message())
    }

    async fn recent(&self, room_id: i64, limit: i64) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, room_id, sender_id, message_text, message_type,
                   file_url, file_name, file_size, quoted_message_id,
                   is_read, created_at
            FROM messages
            WHERE room_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(room_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        // Newest-first from the index, chronological for replay
        let mut messages: Vec<Message> = rows.into_iter().map(|r| r.into_message()).collect();
        messages.reverse();
        Ok(messages)
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, room_id, sender_id, message_text, message_type,
                   file_url, file_name, file_size, quoted_message_id,
                   is_read, created_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_message()))
    }

    async fn quote_view(&self, id: i64) -> Result<Option<QuoteView>, AppError> {
        let row = sqlx::query_as::<_, QuoteRow>(
            r#"
            SELECT m.id, m.room_id, m.message_text, m.message_type, m.file_name,
                   m.sender_id,
                   u.username AS sender_username,
                   u.full_name AS sender_name
            FROM messages m
            JOIN users u ON m.sender_id = u.id
            WHERE m.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_view()))
    }

    async fn set_read(&self, room_id: i64, message_ids: &[i64]) -> Result<(), AppError> {
        sqlx::query("UPDATE messages SET is_read = TRUE WHERE room_id = $1 AND id = ANY($2)")
            .bind(room_id)
            .bind(message_ids)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn unread_ids(&self, room_id: i64, reader_id: i64) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM messages
            WHERE room_id = $1 AND sender_id != $2 AND is_read = FALSE
            ORDER BY created_at
            "#,
        )
        .bind(room_id)
        .bind(reader_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn readable_ids(
        &self,
        room_id: i64,
        reader_id: i64,
        candidates: &[i64],
    ) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM messages
            WHERE room_id = $1 AND sender_id != $2 AND id = ANY($3)
            ORDER BY created_at
            "#,
        )
        .bind(room_id)
        .bind(reader_id)
        .bind(candidates)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
