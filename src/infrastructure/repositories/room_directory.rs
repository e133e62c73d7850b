//! Room Directory Implementation
//!
//! PostgreSQL room queries hydrated with participant and task display fields.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Room, RoomDirectory};
use crate::shared::error::AppError;

/// PostgreSQL-backed room authorization source.
pub struct PgRoomDirectory {
    pool: PgPool,
}

impl PgRoomDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for room queries with display joins.
#[derive(Debug, sqlx::FromRow)]
struct RoomRow {
    id: i64,
    client_id: i64,
    technician_id: i64,
    task_id: i64,
    is_active: bool,
    last_message_at: Option<DateTime<Utc>>,
    client_username: String,
    client_name: Option<String>,
    client_avatar: Option<String>,
    technician_username: String,
    technician_name: Option<String>,
    technician_avatar: Option<String>,
    task_name: String,
}

impl RoomRow {
    fn into_room(self) -> Room {
        Room {
            id: self.id,
            client_id: self.client_id,
            technician_id: self.technician_id,
            task_id: self.task_id,
            active: self.is_active,
            last_message_at: self.last_message_at,
            client_username: self.client_username,
            client_name: self.client_name,
            client_avatar: self.client_avatar,
            technician_username: self.technician_username,
            technician_name: self.technician_name,
            technician_avatar: self.technician_avatar,
            task_name: self.task_name,
        }
    }
}

const ROOM_SELECT: &str = r#"
    SELECT
        cr.id, cr.client_id, cr.technician_id, cr.task_id,
        cr.is_active, cr.last_message_at,
        client.username AS client_username,
        client.full_name AS client_name,
        client.avatar_url AS client_avatar,
        tech.username AS technician_username,
        tech.full_name AS technician_name,
        tech.avatar_url AS technician_avatar,
        t.task_name
    FROM chat_rooms cr
    JOIN users client ON cr.client_id = client.id
    JOIN users tech ON cr.technician_id = tech.id
    JOIN tasks t ON cr.task_id = t.id
"#;

#[async_trait]
impl RoomDirectory for PgRoomDirectory {
    async fn rooms_of(&self, user_id: i64) -> Result<Vec<Room>, AppError> {
        let rows = sqlx::query_as::<_, RoomRow>(&format!(
            "{ROOM_SELECT} WHERE (cr.client_id = $1 OR cr.technician_id = $1) AND cr.is_active = TRUE"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_room()).collect())
    }

    async fn find_by_id(&self, room_id: i64) -> Result<Option<Room>, AppError> {
        let row = sqlx::query_as::<_, RoomRow>(&format!("{ROOM_SELECT} WHERE cr.id = $1"))
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_room()))
    }
}
