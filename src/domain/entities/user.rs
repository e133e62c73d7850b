//! User entity, identity resolution, and presence cache traits.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// User roles matching the `user_type` column constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Requests support inside rooms they own
    Client,
    /// Handles support requests inside assigned rooms
    Technician,
    /// Observes through the reporting surface, never joins rooms
    Admin,
}

impl UserRole {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "technician" => Self::Technician,
            "admin" => Self::Admin,
            _ => Self::Client,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Technician => "technician",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a user account in the support-chat system.
///
/// Maps to the `users` table:
/// - id: BIGINT PRIMARY KEY
/// - external_user_id: VARCHAR(64) NOT NULL UNIQUE (stable identifier from the account service)
/// - username: VARCHAR(64) NOT NULL UNIQUE
/// - full_name: VARCHAR(128) NULL
/// - avatar_url: TEXT NULL
/// - user_type: VARCHAR(20) NOT NULL ('client' | 'technician' | 'admin')
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
/// - is_online: BOOLEAN NOT NULL DEFAULT FALSE -- cache, owned by the presence registry at runtime
/// - last_seen: TIMESTAMPTZ NULL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Primary key
    pub id: i64,

    /// Stable identifier issued by the external account service
    pub external_id: String,

    /// Unique username
    pub username: String,

    /// Full display name
    pub full_name: Option<String>,

    /// URL to the user's avatar image
    pub avatar_url: Option<String>,

    /// Role within the support system
    pub role: UserRole,

    /// Whether the account is active; inactive users are refused at admission
    pub active: bool,

    /// Durable online cache. The presence registry owns the live value;
    /// this field is only refreshed on 0<->1 session transitions.
    pub is_online: bool,

    /// Timestamp of the last 1->0 presence transition
    pub last_seen: Option<DateTime<Utc>>,
}

impl User {
    /// Get the user's display name, falling back to username if not set.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}

/// Resolves a credential token to an active user record.
///
/// Returns `Ok(None)` for tokens that verify but reference an unknown or
/// inactive user; the caller maps both to `Unauthenticated`.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Option<User>, AppError>;
}

/// Refreshes the durable online/last-seen cache on presence transitions.
///
/// The in-process presence registry is the authority at runtime; these writes
/// only keep the `users` row in step for offline consumers (push hand-off,
/// reporting).
#[async_trait]
pub trait PresenceStore: Send + Sync {
    async fn mark_online(&self, user_id: i64) -> Result<(), AppError>;

    async fn mark_offline(&self, user_id: i64, last_seen: DateTime<Utc>) -> Result<(), AppError>;
}
