//! Shared test fixtures: in-memory collaborator doubles and a fully wired
//! realtime core.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use support_chat_server::domain::{
    Message, MessageStore, NewMessage, NotificationPayload, NotificationSink, PresenceStore,
    QuoteView, ReadReceiptStore, Room, RoomDirectory, User, UserRole,
};
use support_chat_server::presentation::websocket::{
    admit_session, teardown_session, ConnectedSession, MessageDispatcher, PresenceRegistry,
    ReadReceiptTracker, RoomHub, RoomService, ServerEvent, TypingNotifier,
};
use support_chat_server::shared::error::AppError;

/// In-memory message store with monotonic ids and timestamps.
pub struct InMemoryMessageStore {
    messages: Mutex<Vec<Message>>,
    senders: HashMap<i64, User>,
    next_id: AtomicI64,
    tick: AtomicI64,
}

impl InMemoryMessageStore {
    pub fn new(senders: &[User]) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            senders: senders.iter().map(|u| (u.id, u.clone())).collect(),
            next_id: AtomicI64::new(1000),
            tick: AtomicI64::new(0),
        }
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn stored(&self, id: i64) -> Option<Message> {
        self.messages.lock().iter().find(|m| m.id == id).cloned()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(&self, draft: &NewMessage) -> Result<Message, AppError> {
        let tick = self.tick.fetch_add(1, Ordering::SeqCst);
        let message = Message {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            room_id: draft.room_id,
            sender_id: draft.sender_id,
            body: draft.body.clone(),
            kind: draft.kind,
            file_url: draft.file_url.clone(),
            file_name: draft.file_name.clone(),
            file_size: draft.file_size,
            quoted_id: draft.quoted_id,
            read: false,
            created_at: Utc.timestamp_opt(1_700_000_000 + tick, 0).unwrap(),
        };
        self.messages.lock().push(message.clone());
        Ok(message)
    }

    async fn recent(&self, room_id: i64, limit: i64) -> Result<Vec<Message>, AppError> {
        let messages = self.messages.lock();
        let mut in_room: Vec<Message> = messages
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        let keep = in_room.len().saturating_sub(limit as usize);
        in_room.drain(..keep);
        Ok(in_room)
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        Ok(self.stored(id))
    }

    async fn quote_view(&self, id: i64) -> Result<Option<QuoteView>, AppError> {
        let Some(message) = self.stored(id) else {
            return Ok(None);
        };
        let sender = self
            .senders
            .get(&message.sender_id)
            .ok_or_else(|| AppError::Internal("unknown sender in fixture".into()))?;
        Ok(Some(QuoteView {
            id: message.id,
            room_id: message.room_id,
            body: message.body,
            kind: message.kind,
            file_name: message.file_name,
            sender_id: sender.id,
            sender_username: sender.username.clone(),
            sender_name: sender.full_name.clone(),
        }))
    }

    async fn set_read(&self, room_id: i64, message_ids: &[i64]) -> Result<(), AppError> {
        let mut messages = self.messages.lock();
        for message in messages.iter_mut() {
            if message.room_id == room_id && message_ids.contains(&message.id) {
                message.read = true;
            }
        }
        Ok(())
    }

    async fn unread_ids(&self, room_id: i64, reader_id: i64) -> Result<Vec<i64>, AppError> {
        Ok(self
            .messages
            .lock()
            .iter()
            .filter(|m| m.room_id == room_id && m.sender_id != reader_id && !m.read)
            .map(|m| m.id)
            .collect())
    }

    async fn readable_ids(
        &self,
        room_id: i64,
        reader_id: i64,
        candidates: &[i64],
    ) -> Result<Vec<i64>, AppError> {
        Ok(self
            .messages
            .lock()
            .iter()
            .filter(|m| {
                m.room_id == room_id && m.sender_id != reader_id && candidates.contains(&m.id)
            })
            .map(|m| m.id)
            .collect())
    }
}

/// In-memory receipt store keyed by (message, reader).
#[derive(Default)]
pub struct InMemoryReceiptStore {
    receipts: Mutex<HashSet<(i64, i64)>>,
}

impl InMemoryReceiptStore {
    pub fn receipt_count(&self) -> usize {
        self.receipts.lock().len()
    }
}

#[async_trait]
impl ReadReceiptStore for InMemoryReceiptStore {
    async fn insert_if_absent(&self, message_id: i64, reader_id: i64) -> Result<bool, AppError> {
        Ok(self.receipts.lock().insert((message_id, reader_id)))
    }
}

/// Fixed room set standing in for the room queries.
pub struct StaticRoomDirectory {
    rooms: Vec<Room>,
}

impl StaticRoomDirectory {
    pub fn new(rooms: Vec<Room>) -> Self {
        Self { rooms }
    }
}

#[async_trait]
impl RoomDirectory for StaticRoomDirectory {
    async fn rooms_of(&self, user_id: i64) -> Result<Vec<Room>, AppError> {
        Ok(self
            .rooms
            .iter()
            .filter(|r| r.active && r.is_participant(user_id))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, room_id: i64) -> Result<Option<Room>, AppError> {
        Ok(self.rooms.iter().find(|r| r.id == room_id).cloned())
    }
}

/// Presence cache that records every durable refresh.
#[derive(Default)]
pub struct InMemoryPresenceStore {
    online: Mutex<Vec<i64>>,
    offline: Mutex<Vec<(i64, DateTime<Utc>)>>,
}

impl InMemoryPresenceStore {
    pub fn marked_online(&self) -> Vec<i64> {
        self.online.lock().clone()
    }

    pub fn marked_offline(&self) -> Vec<i64> {
        self.offline.lock().iter().map(|(id, _)| *id).collect()
    }
}

#[async_trait]
impl PresenceStore for InMemoryPresenceStore {
    async fn mark_online(&self, user_id: i64) -> Result<(), AppError> {
        self.online.lock().push(user_id);
        Ok(())
    }

    async fn mark_offline(&self, user_id: i64, last_seen: DateTime<Utc>) -> Result<(), AppError> {
        self.offline.lock().push((user_id, last_seen));
        Ok(())
    }
}

/// Notification sink that records every hand-off.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<NotificationPayload>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<NotificationPayload> {
        self.sent.lock().clone()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, payload: NotificationPayload) {
        self.sent.lock().push(payload);
    }
}

pub fn client(id: i64, username: &str) -> User {
    user_with_role(id, username, UserRole::Client)
}

pub fn technician(id: i64, username: &str) -> User {
    user_with_role(id, username, UserRole::Technician)
}

fn user_with_role(id: i64, username: &str, role: UserRole) -> User {
    User {
        id,
        external_id: format!("ext-{id}"),
        username: username.to_string(),
        full_name: None,
        avatar_url: None,
        role,
        active: true,
        is_online: false,
        last_seen: None,
    }
}

pub fn room(id: i64, client: &User, technician: &User) -> Room {
    Room {
        id,
        client_id: client.id,
        technician_id: technician.id,
        task_id: id * 10,
        active: true,
        last_message_at: None,
        client_username: client.username.clone(),
        client_name: client.full_name.clone(),
        client_avatar: None,
        technician_username: technician.username.clone(),
        technician_name: technician.full_name.clone(),
        technician_avatar: None,
        task_name: format!("Task {id}"),
    }
}

/// A fully wired realtime core over the in-memory doubles.
pub struct Harness {
    pub hub: Arc<RoomHub>,
    pub presence: Arc<PresenceRegistry>,
    pub rooms: Arc<RoomService>,
    pub dispatcher: Arc<MessageDispatcher>,
    pub receipts: Arc<ReadReceiptTracker>,
    pub typing: Arc<TypingNotifier>,
    pub store: Arc<InMemoryMessageStore>,
    pub receipt_store: Arc<InMemoryReceiptStore>,
    pub presence_store: Arc<InMemoryPresenceStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(rooms: Vec<Room>, users: &[User]) -> Self {
        Self::with_backlog_limit(rooms, users, 50)
    }

    pub fn with_backlog_limit(rooms: Vec<Room>, users: &[User], backlog_limit: i64) -> Self {
        let hub = Arc::new(RoomHub::new());
        let presence = Arc::new(PresenceRegistry::new());
        let directory = Arc::new(StaticRoomDirectory::new(rooms));
        let store = Arc::new(InMemoryMessageStore::new(users));
        let receipt_store = Arc::new(InMemoryReceiptStore::default());
        let presence_store = Arc::new(InMemoryPresenceStore::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let room_service = Arc::new(RoomService::new(
            hub.clone(),
            directory.clone(),
            store.clone(),
            backlog_limit,
        ));
        let dispatcher = Arc::new(MessageDispatcher::new(
            hub.clone(),
            presence.clone(),
            directory.clone(),
            store.clone(),
            notifier.clone(),
        ));
        let receipts = Arc::new(ReadReceiptTracker::new(
            hub.clone(),
            store.clone(),
            receipt_store.clone(),
        ));
        let typing = Arc::new(TypingNotifier::new(hub.clone()));

        Self {
            hub,
            presence,
            rooms: room_service,
            dispatcher,
            receipts,
            typing,
            store,
            receipt_store,
            presence_store,
            notifier,
        }
    }

    /// Admit a session through the connection handler's admission path and
    /// consume its `ready` event.
    pub async fn connect(
        &self,
        user: &User,
    ) -> (
        Arc<ConnectedSession>,
        mpsc::UnboundedReceiver<ServerEvent>,
    ) {
        let (session, mut rx) = ConnectedSession::new(user.clone());
        admit_session(
            &self.hub,
            &self.presence,
            self.presence_store.as_ref(),
            &self.rooms,
            &session,
        )
        .await;
        match rx.try_recv() {
            Ok(ServerEvent::Ready { session_id, .. }) => assert_eq!(session_id, session.id),
            other => panic!("expected ready on admission, got {:?}", other),
        }
        (session, rx)
    }

    /// Tear a session down the way the connection handler does on disconnect.
    pub async fn disconnect(&self, session: &Arc<ConnectedSession>) {
        teardown_session(
            &self.hub,
            &self.presence,
            self.presence_store.as_ref(),
            session,
        )
        .await;
    }
}

/// Pull the next event off a session receiver, panicking when none is queued.
pub fn next_event(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> ServerEvent {
    rx.try_recv().expect("expected a queued event")
}

/// Assert a receiver has nothing queued.
pub fn assert_silent(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) {
    assert!(rx.try_recv().is_err(), "expected no queued events");
}

/// Discard everything currently queued on a receiver.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) {
    while rx.try_recv().is_ok() {}
}
