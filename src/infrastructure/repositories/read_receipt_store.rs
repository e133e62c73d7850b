//! Read Receipt Store Implementation
//!
//! Insert-if-absent over the (message, reader) primary key; duplicates hit
//! the conflict clause and report nothing inserted.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::ReadReceiptStore;
use crate::shared::error::AppError;

/// PostgreSQL-backed read receipt store.
pub struct PgReadReceiptStore {
    pool: PgPool,
}

impl PgReadReceiptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadReceiptStore for PgReadReceiptStore {
    async fn insert_if_absent(&self, message_id: i64, reader_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO message_reads (message_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (message_id, user_id) DO NOTHING
            "#,
        )
        .bind(message_id)
        .bind(reader_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
