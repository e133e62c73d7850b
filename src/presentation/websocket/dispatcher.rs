//! Message Dispatcher
//!
//! Validates and persists outgoing messages, fans them out to the room, and
//! hands offline participants over to the push collaborator.

use std::sync::Arc;

use validator::Validate;

use crate::domain::{
    MessageKind, MessageStore, NewMessage, NotificationPayload, NotificationSink, QuoteView,
    RoomDirectory,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;

use super::events::{MessageView, SendMessagePayload, ServerEvent};
use super::hub::RoomHub;
use super::presence::PresenceRegistry;
use super::session::ConnectedSession;

/// Notification previews are truncated to this many characters
const PREVIEW_LENGTH: usize = 120;

pub struct MessageDispatcher {
    hub: Arc<RoomHub>,
    presence: Arc<PresenceRegistry>,
    rooms: Arc<dyn RoomDirectory>,
    messages: Arc<dyn MessageStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl MessageDispatcher {
    pub fn new(
        hub: Arc<RoomHub>,
        presence: Arc<PresenceRegistry>,
        rooms: Arc<dyn RoomDirectory>,
        messages: Arc<dyn MessageStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            hub,
            presence,
            rooms,
            messages,
            notifier,
        }
    }

    /// Validate, persist, and broadcast one message.
    ///
    /// All validation happens before any mutation; a failure leaves no
    /// partial side effects. Append-then-broadcast is serialized per room so
    /// every subscribed session observes messages in append order.
    pub async fn send(
        &self,
        session: &Arc<ConnectedSession>,
        payload: SendMessagePayload,
    ) -> Result<MessageView, AppError> {
        let room_id = payload.room_id;

        // Sending requires having joined, not merely belonging to the room.
        if !self.hub.is_subscribed(&session.id, room_id) {
            return Err(AppError::AccessDenied("Access denied to this room".into()));
        }

        let quoted = self.validate_quote(room_id, payload.quoted_id).await?;
        let draft = self.validate_payload(session.user_id(), payload)?;

        // Participants are fetched up front so a storage failure here aborts
        // the send before anything is persisted or broadcast.
        let room = self
            .rooms
            .find_by_id(room_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Room not found".into()))?;

        let view = {
            let lock = self.hub.room_lock(room_id);
            let _guard = lock.lock().await;

            let message = self.messages.append(&draft).await?;
            let view = MessageView::hydrate(message, &session.user, quoted);
            self.hub
                .send_to_room(room_id, &ServerEvent::NewMessage(view.clone()));
            view
        };

        metrics::MESSAGES_DISPATCHED.inc();
        tracing::debug!(
            room_id = room_id,
            message_id = view.id,
            sender_id = view.sender_id,
            "Message dispatched"
        );

        // Best-effort hand-off for the offline counterpart; enqueue only,
        // failure never fails the send.
        if let Some(other_id) = room.other_participant(session.user_id()) {
            if !self.presence.is_online(other_id) {
                self.notifier.notify(NotificationPayload {
                    user_id: other_id,
                    message_id: view.id,
                    room_id,
                    sender_name: session.user.display_name().to_string(),
                    preview: preview_of(&view.body, view.kind),
                });
            }
        }

        Ok(view)
    }

    /// Look up a message for quoting, scoped to a room the session joined.
    pub async fn quote_lookup(
        &self,
        session: &Arc<ConnectedSession>,
        message_id: i64,
        room_id: i64,
    ) -> Result<QuoteView, AppError> {
        if !self.hub.is_subscribed(&session.id, room_id) {
            return Err(AppError::AccessDenied("Access denied to this room".into()));
        }

        self.messages
            .quote_view(message_id)
            .await?
            .filter(|q| q.room_id == room_id)
            .ok_or_else(|| AppError::NotFound("Message not found".into()))
    }

    /// A quoted message must exist and belong to the same room.
    async fn validate_quote(
        &self,
        room_id: i64,
        quoted_id: Option<i64>,
    ) -> Result<Option<QuoteView>, AppError> {
        let Some(quoted_id) = quoted_id else {
            return Ok(None);
        };

        let quoted = self
            .messages
            .fetch_by_id(quoted_id)
            .await?
            .ok_or(AppError::InvalidQuote)?;
        if quoted.room_id != room_id {
            return Err(AppError::InvalidQuote);
        }

        // Hydrated text/sender for the broadcast
        self.messages
            .quote_view(quoted_id)
            .await?
            .ok_or(AppError::InvalidQuote)
            .map(Some)
    }

    fn validate_payload(
        &self,
        sender_id: i64,
        payload: SendMessagePayload,
    ) -> Result<NewMessage, AppError> {
        payload.validate().map_err(validation_error)?;

        let body = payload.body.unwrap_or_default();
        match payload.kind {
            MessageKind::Text if body.trim().is_empty() => {
                return Err(AppError::Validation("Message text is required".into()));
            }
            kind if kind.requires_file() && payload.file_url.is_none() => {
                return Err(AppError::Validation(
                    "File reference is required for file messages".into(),
                ));
            }
            _ => {}
        }

        Ok(NewMessage {
            room_id: payload.room_id,
            sender_id,
            body,
            kind: payload.kind,
            file_url: payload.file_url,
            file_name: payload.file_name,
            file_size: payload.file_size,
            quoted_id: payload.quoted_id,
        })
    }
}

/// Truncated body, or a kind placeholder for bodyless file messages.
fn preview_of(body: &str, kind: MessageKind) -> String {
    if body.trim().is_empty() {
        return match kind {
            MessageKind::Image => "Sent an image".into(),
            MessageKind::Audio => "Sent a voice note".into(),
            _ => "Sent a file".into(),
        };
    }
    body.chars().take(PREVIEW_LENGTH).collect()
}
