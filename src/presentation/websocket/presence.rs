//! Presence Registry
//!
//! Per-user live-session counting. A user connected from several devices
//! stays online until the last session closes; only the 0<->1 transitions
//! are observable.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Debug, Default)]
struct PresenceEntry {
    sessions: u32,
    last_seen: Option<DateTime<Utc>>,
}

/// Tracks online/offline state per user across concurrent sessions.
pub struct PresenceRegistry {
    entries: DashMap<i64, PresenceEntry>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Record a new session. Returns true on the 0->1 transition, when the
    /// user came online and `user_online` should be broadcast.
    pub fn on_connect(&self, user_id: i64) -> bool {
        let mut entry = self.entries.entry(user_id).or_default();
        entry.sessions += 1;
        entry.sessions == 1
    }

    /// Record a closed session. Returns the last-seen timestamp on the 1->0
    /// transition, when the user went offline. Redundant calls past zero are
    /// no-ops, keeping teardown idempotent.
    pub fn on_disconnect(&self, user_id: i64) -> Option<DateTime<Utc>> {
        let mut entry = self.entries.get_mut(&user_id)?;
        if entry.sessions == 0 {
            return None;
        }
        entry.sessions -= 1;
        if entry.sessions == 0 {
            let now = Utc::now();
            entry.last_seen = Some(now);
            Some(now)
        } else {
            None
        }
    }

    /// Whether at least one live session exists for the user.
    pub fn is_online(&self, user_id: i64) -> bool {
        self.entries
            .get(&user_id)
            .map(|e| e.sessions > 0)
            .unwrap_or(false)
    }

    /// Last-seen timestamp recorded on the most recent 1->0 transition.
    pub fn last_seen(&self, user_id: i64) -> Option<DateTime<Utc>> {
        self.entries.get(&user_id).and_then(|e| e.last_seen)
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
