//! WebSocket Connection Handler
//!
//! Admission, the per-session event loop, and exactly-once teardown.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::domain::PresenceStore;
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::startup::AppState;

use super::events::{ClientEvent, ServerEvent};
use super::hub::RoomHub;
use super::presence::PresenceRegistry;
use super::rooms::RoomService;
use super::session::ConnectedSession;

/// Upgrade query parameters
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    token: Option<String>,
}

/// WebSocket upgrade handler.
///
/// The credential token is resolved before the upgrade so a bad credential is
/// refused with 401 and no session state ever exists for it.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let token = params
        .token
        .ok_or_else(|| AppError::Unauthenticated("Credential token is required".into()))?;

    let user = state
        .identity
        .resolve(&token)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found or inactive".into()))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

/// Drive one admitted connection to completion.
async fn handle_socket(socket: WebSocket, state: AppState, user: crate::domain::User) {
    let (session, mut rx) = ConnectedSession::new(user);

    // Split socket for concurrent read/write
    let (mut sink, mut stream) = socket.split();

    // Forward queued events to the socket
    let sender_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let room_ids = admit_session(
        &state.hub,
        &state.presence,
        state.presence_store.as_ref(),
        &state.room_service,
        &session,
    )
    .await;

    tracing::info!(
        user_id = session.user_id(),
        session_id = %session.id,
        rooms = room_ids.len(),
        "User connected"
    );

    // Main event loop; every failure is reported to this session only.
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Err(e) = dispatch_event(&text, &session, &state).await {
                    session.send(ServerEvent::Error {
                        message: e.client_message(),
                    });
                }
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(session_id = %session.id, "Connection closed");
                break;
            }
            Ok(_) => {
                // Ping/pong handled by axum; binary frames ignored
            }
            Err(e) => {
                tracing::debug!(session_id = %session.id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    teardown_session(
        &state.hub,
        &state.presence,
        state.presence_store.as_ref(),
        &session,
    )
    .await;
    sender_task.abort();

    tracing::info!(
        user_id = session.user_id(),
        session_id = %session.id,
        "User disconnected"
    );
}

/// Admit one session: register it, subscribe it to its rooms, and emit the
/// admission events.
///
/// The session receives `ready` with its subscribed room ids. On the user's
/// 0->1 presence transition, `user_online` goes to every subscribed room,
/// skipping the new session itself. Returns the subscribed room ids.
pub async fn admit_session(
    hub: &RoomHub,
    presence: &PresenceRegistry,
    presence_store: &dyn PresenceStore,
    room_service: &RoomService,
    session: &Arc<ConnectedSession>,
) -> Vec<i64> {
    hub.register(session.clone());
    metrics::SESSIONS_ACTIVE.inc();

    // Auto-subscribe the session to every room its user participates in.
    // A storage failure here leaves the session usable; rooms can still be
    // joined explicitly.
    let rooms = match room_service.resolve_and_subscribe_all(session).await {
        Ok(rooms) => rooms,
        Err(e) => {
            tracing::error!(
                user_id = session.user_id(),
                error = %e,
                "Failed to subscribe session to its rooms"
            );
            session.send(ServerEvent::Error {
                message: e.client_message(),
            });
            Vec::new()
        }
    };
    let room_ids: Vec<i64> = rooms.iter().map(|r| r.id).collect();

    session.send(ServerEvent::Ready {
        session_id: session.id.clone(),
        room_ids: room_ids.clone(),
    });

    // Presence is user-wide: the online broadcast goes to all of the user's
    // rooms, and only on the 0->1 transition.
    if presence.on_connect(session.user_id()) {
        if let Err(e) = presence_store.mark_online(session.user_id()).await {
            tracing::error!(
                user_id = session.user_id(),
                error = %e,
                "Failed to refresh online cache"
            );
        }
        let event = ServerEvent::UserOnline {
            user_id: session.user_id(),
            username: session.user.username.clone(),
        };
        for room_id in &room_ids {
            hub.send_to_room_except_session(*room_id, &session.id, &event);
        }
    }

    room_ids
}

/// Dispatch one client event; the closed variant set keeps this exhaustive.
async fn dispatch_event(
    text: &str,
    session: &Arc<ConnectedSession>,
    state: &AppState,
) -> Result<(), AppError> {
    let event: ClientEvent = serde_json::from_str(text)
        .map_err(|e| AppError::Validation(format!("Malformed event: {}", e)))?;

    match event {
        ClientEvent::JoinRoom(r) => {
            let (room, recent_messages) = state.room_service.join(session, r.room_id).await?;
            session.send(ServerEvent::RoomJoined {
                room,
                recent_messages,
            });
        }
        ClientEvent::SendMessage(payload) => {
            // The sender receives the broadcast through its room subscription
            state.dispatcher.send(session, payload).await?;
        }
        ClientEvent::MarkMessagesRead(payload) => {
            state.receipts.mark_read(session, payload).await?;
        }
        ClientEvent::TypingStart(r) => {
            state.typing.start(session, r.room_id)?;
        }
        ClientEvent::TypingStop(r) => {
            state.typing.stop(session, r.room_id)?;
        }
        ClientEvent::GetMessageForQuote(q) => {
            let view = state
                .dispatcher
                .quote_lookup(session, q.message_id, q.room_id)
                .await?;
            session.send(ServerEvent::MessageForQuote(view));
        }
    }

    Ok(())
}

/// Full teardown: leave every room, demote presence, broadcast offline.
///
/// On the user's 1->0 presence transition, `user_offline` goes to every room
/// the session was subscribed to. Every step is idempotent, so concurrent
/// error paths around the same disconnect cannot double-apply state changes.
pub async fn teardown_session(
    hub: &RoomHub,
    presence: &PresenceRegistry,
    presence_store: &dyn PresenceStore,
    session: &Arc<ConnectedSession>,
) {
    let rooms = hub.unregister(&session.id);
    metrics::SESSIONS_ACTIVE.dec();

    if let Some(last_seen) = presence.on_disconnect(session.user_id()) {
        if let Err(e) = presence_store
            .mark_offline(session.user_id(), last_seen)
            .await
        {
            tracing::error!(
                user_id = session.user_id(),
                error = %e,
                "Failed to refresh offline cache"
            );
        }

        let event = ServerEvent::UserOffline {
            user_id: session.user_id(),
            username: session.user.username.clone(),
        };
        for room_id in rooms {
            hub.send_to_room(room_id, &event);
        }
    }
}
