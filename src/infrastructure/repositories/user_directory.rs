//! User Directory Implementation
//!
//! Resolves credential tokens to active users and refreshes the durable
//! presence cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use sqlx::PgPool;

use crate::domain::{IdentityResolver, PresenceStore, User, UserRole};
use crate::shared::error::AppError;

/// JWT claims issued by the account service
#[derive(Debug, serde::Deserialize)]
struct Claims {
    /// External user identifier
    sub: String,
    #[allow(dead_code)]
    exp: usize,
}

/// PostgreSQL-backed identity resolver and presence cache.
pub struct PgUserDirectory {
    pool: PgPool,
    jwt_secret: String,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool, jwt_secret: String) -> Self {
        Self { pool, jwt_secret }
    }
}

/// Internal row type for user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    external_user_id: String,
    username: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
    user_type: String,
    is_active: bool,
    is_online: bool,
    last_seen: Option<DateTime<Utc>>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            external_id: self.external_user_id,
            username: self.username,
            full_name: self.full_name,
            avatar_url: self.avatar_url,
            role: UserRole::from_str(&self.user_type),
            active: self.is_active,
            is_online: self.is_online,
            last_seen: self.last_seen,
        }
    }
}

#[async_trait]
impl IdentityResolver for PgUserDirectory {
    /// Resolve a credential token to an active user.
    ///
    /// A token that fails verification resolves to `None` rather than an
    /// error; only storage problems surface as failures.
    async fn resolve(&self, token: &str) -> Result<Option<User>, AppError> {
        let claims = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(error = %e, "Token verification failed");
                return Ok(None);
            }
        };

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, external_user_id, username, full_name, avatar_url,
                   user_type, is_active, is_online, last_seen
            FROM users
            WHERE external_user_id = $1 AND is_active = TRUE
            "#,
        )
        .bind(&claims.sub)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_user()))
    }
}

#[async_trait]
impl PresenceStore for PgUserDirectory {
    async fn mark_online(&self, user_id: i64) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET is_online = TRUE, last_seen = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_offline(&self, user_id: i64, last_seen: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET is_online = FALSE, last_seen = $2 WHERE id = $1")
            .bind(user_id)
            .bind(last_seen)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
