//! Push Notification Hand-off
//!
//! Best-effort FCM delivery for offline room participants. The realtime
//! send path only enqueues; a single background worker looks up the
//! recipient's device token and posts to FCM. Every failure here is logged
//! and swallowed, a push problem must never fail a message send.

use std::sync::Arc;

use serde_json::json;
use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::config::PushSettings;
use crate::domain::{NotificationPayload, NotificationSink};
use crate::infrastructure::metrics::PUSH_HANDOFFS;

/// Queue-backed FCM notifier.
pub struct FcmNotifier {
    tx: mpsc::UnboundedSender<NotificationPayload>,
}

impl FcmNotifier {
    /// Spawn the delivery worker and return the enqueue handle.
    pub fn spawn(settings: PushSettings, pool: PgPool) -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
        let worker = PushWorker {
            settings,
            pool,
            client: reqwest::Client::new(),
        };

        tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                worker.deliver(payload).await;
            }
        });

        Arc::new(Self { tx })
    }
}

impl NotificationSink for FcmNotifier {
    fn notify(&self, payload: NotificationPayload) {
        if self.tx.send(payload).is_err() {
            tracing::warn!("Push worker channel closed, notification dropped");
        }
    }
}

struct PushWorker {
    settings: PushSettings,
    pool: PgPool,
    client: reqwest::Client,
}

impl PushWorker {
    async fn deliver(&self, payload: NotificationPayload) {
        if !self.settings.enabled {
            PUSH_HANDOFFS.with_label_values(&["skipped"]).inc();
            return;
        }

        let token = match self.device_token(payload.user_id).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::debug!(user_id = payload.user_id, "No device token, push skipped");
                PUSH_HANDOFFS.with_label_values(&["skipped"]).inc();
                return;
            }
            Err(e) => {
                tracing::warn!(user_id = payload.user_id, error = %e, "Device token lookup failed");
                PUSH_HANDOFFS.with_label_values(&["failed"]).inc();
                return;
            }
        };

        let body = json!({
            "to": token,
            "notification": {
                "title": payload.sender_name,
                "body": payload.preview,
            },
            "data": {
                "room_id": payload.room_id.to_string(),
                "message_id": payload.message_id.to_string(),
            },
        });

        let result = self
            .client
            .post(&self.settings.endpoint)
            .header(
                "Authorization",
                format!("key={}", self.settings.server_key),
            )
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(
                    user_id = payload.user_id,
                    message_id = payload.message_id,
                    "Push notification delivered"
                );
                PUSH_HANDOFFS.with_label_values(&["delivered"]).inc();
            }
            Ok(response) => {
                tracing::warn!(
                    user_id = payload.user_id,
                    status = %response.status(),
                    "Push delivery rejected"
                );
                PUSH_HANDOFFS.with_label_values(&["failed"]).inc();
            }
            Err(e) => {
                tracing::warn!(user_id = payload.user_id, error = %e, "Push delivery failed");
                PUSH_HANDOFFS.with_label_values(&["failed"]).inc();
            }
        }
    }

    async fn device_token(&self, user_id: i64) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>("SELECT fcm_token FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.flatten())
    }
}
