//! Room Hub
//!
//! The in-process room registry: tracks which sessions are subscribed to
//! which rooms and fans events out to them. Constructed once per process in
//! `Application::build`; tests build isolated instances.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use super::events::ServerEvent;
use super::session::{ConnectedSession, SessionId};

/// Room registry and fan-out surface.
pub struct RoomHub {
    /// Active sessions by session id
    sessions: DashMap<SessionId, Arc<ConnectedSession>>,
    /// Room id to subscribed session ids
    room_sessions: DashMap<i64, HashSet<SessionId>>,
    /// Inverse index for fast teardown
    session_rooms: DashMap<SessionId, HashSet<i64>>,
    /// Per-room append serialization locks; rooms never share a lock
    room_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl RoomHub {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            room_sessions: DashMap::new(),
            session_rooms: DashMap::new(),
            room_locks: DashMap::new(),
        }
    }

    /// Register a newly admitted session.
    pub fn register(&self, session: Arc<ConnectedSession>) {
        self.session_rooms.insert(session.id.clone(), HashSet::new());
        self.sessions.insert(session.id.clone(), session);
    }

    /// Remove a session and every subscription it held.
    ///
    /// Returns the room ids the session was subscribed to, for the offline
    /// presence broadcast. Idempotent: a second call returns an empty list.
    pub fn unregister(&self, session_id: &str) -> Vec<i64> {
        self.sessions.remove(session_id);

        let rooms: Vec<i64> = self
            .session_rooms
            .remove(session_id)
            .map(|(_, rooms)| rooms.into_iter().collect())
            .unwrap_or_default();

        for room_id in &rooms {
            if let Some(mut members) = self.room_sessions.get_mut(room_id) {
                members.remove(session_id);
            }
        }

        rooms
    }

    /// Subscribe a session to a room. Idempotent.
    pub fn subscribe(&self, session_id: &str, room_id: i64) {
        self.room_sessions
            .entry(room_id)
            .or_default()
            .insert(session_id.to_string());
        self.session_rooms
            .entry(session_id.to_string())
            .or_default()
            .insert(room_id);
    }

    /// Drop a single subscription. A leave with no prior join is a no-op.
    pub fn unsubscribe(&self, session_id: &str, room_id: i64) {
        if let Some(mut members) = self.room_sessions.get_mut(&room_id) {
            members.remove(session_id);
        }
        if let Some(mut rooms) = self.session_rooms.get_mut(session_id) {
            rooms.remove(&room_id);
        }
    }

    /// Whether the session has performed a join on this room (auto-join at
    /// admission included). Sending requires this, not mere room membership.
    pub fn is_subscribed(&self, session_id: &str, room_id: i64) -> bool {
        self.session_rooms
            .get(session_id)
            .map(|rooms| rooms.contains(&room_id))
            .unwrap_or(false)
    }

    /// All sessions currently subscribed to a room.
    ///
    /// Unknown rooms yield an empty set, making broadcasts to them no-ops.
    pub fn members_of(&self, room_id: i64) -> Vec<Arc<ConnectedSession>> {
        self.room_sessions
            .get(&room_id)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|id| self.sessions.get(id).map(|s| s.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The per-room lock serializing append-then-broadcast for that room.
    pub fn room_lock(&self, room_id: i64) -> Arc<Mutex<()>> {
        self.room_locks.entry(room_id).or_default().clone()
    }

    /// Broadcast to every session subscribed to the room.
    pub fn send_to_room(&self, room_id: i64, event: &ServerEvent) {
        for session in self.members_of(room_id) {
            session.send(event.clone());
        }
    }

    /// Broadcast to the room, skipping one session (the originator).
    pub fn send_to_room_except_session(&self, room_id: i64, skip: &str, event: &ServerEvent) {
        for session in self.members_of(room_id) {
            if session.id != skip {
                session.send(event.clone());
            }
        }
    }

    /// Broadcast to the room, skipping every session of one user.
    pub fn send_to_room_except_user(&self, room_id: i64, skip_user: i64, event: &ServerEvent) {
        for session in self.members_of(room_id) {
            if session.user_id() != skip_user {
                session.send(event.clone());
            }
        }
    }

    /// Number of live sessions, for metrics and health reporting.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for RoomHub {
    fn default() -> Self {
        Self::new()
    }
}
