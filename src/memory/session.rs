//! Per-session interaction history with bounded storage
//!
//! Exact-match tier of the memory subsystem:
//! - One ordered list per session id
//! - Maximum 20 records per session (FIFO eviction)
//! - Records are immutable once appended

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Maximum interactions kept per session (bounded storage guarantee)
pub const MAX_SESSION_ENTRIES: usize = 20;

/// One completed task/result pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRecord {
    pub user_task: String,
    pub result: String,
    pub timestamp: DateTime<Utc>,
}

/// Session-keyed ring buffers of interaction records
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, VecDeque<InteractionRecord>>,
    max_entries: usize,
}

impl SessionStore {
    /// Create a store with the default per-session cap
    pub fn new() -> Self {
        Self::with_capacity(MAX_SESSION_ENTRIES)
    }

    /// Create a store with a custom per-session cap
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            max_entries,
        }
    }

    /// Append an interaction, evicting the oldest record at capacity
    pub fn record(&mut self, session_id: &str, user_task: &str, result: &str) {
        let history = self.sessions.entry(session_id.to_string()).or_default();

        if history.len() >= self.max_entries {
            history.pop_front();
        }

        history.push_back(InteractionRecord {
            user_task: user_task.to_string(),
            result: result.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// The last `n` records for a session, oldest first
    pub fn last_n(&self, session_id: &str, n: usize) -> Vec<InteractionRecord> {
        self.sessions.get(session_id).map_or_else(Vec::new, |history| {
            let start = history.len().saturating_sub(n);
            history.range(start..).cloned().collect()
        })
    }

    /// Number of records held for a session
    pub fn len(&self, session_id: &str) -> usize {
        self.sessions.get(session_id).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, session_id: &str) -> bool {
        self.len(session_id) == 0
    }

    /// Number of sessions with at least one record
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop a single session's history
    pub fn clear_session(&mut self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_last_n() {
        let mut store = SessionStore::new();
        store.record("s1", "task a", "result a");
        store.record("s1", "task b", "result b");
        store.record("s2", "other", "other result");

        let last = store.last_n("s1", 5);
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].user_task, "task a");
        assert_eq!(last[1].user_task, "task b");
        assert_eq!(store.last_n("s2", 5).len(), 1);
    }

    #[test]
    fn test_cap_evicts_oldest_first() {
        let mut store = SessionStore::new();
        for i in 0..25 {
            store.record("s1", &format!("task {}", i), "r");
        }

        assert_eq!(store.len("s1"), MAX_SESSION_ENTRIES);
        let oldest = &store.last_n("s1", MAX_SESSION_ENTRIES)[0];
        assert_eq!(oldest.user_task, "task 5");
    }

    #[test]
    fn test_last_n_limits() {
        let mut store = SessionStore::new();
        for i in 0..10 {
            store.record("s1", &format!("task {}", i), "r");
        }

        let last_3 = store.last_n("s1", 3);
        assert_eq!(last_3.len(), 3);
        assert_eq!(last_3[0].user_task, "task 7");
        assert_eq!(last_3[2].user_task, "task 9");
    }

    #[test]
    fn test_unknown_session_is_empty() {
        let store = SessionStore::new();
        assert!(store.last_n("nope", 3).is_empty());
        assert!(store.is_empty("nope"));
    }

    #[test]
    fn test_clear_session() {
        let mut store = SessionStore::new();
        store.record("s1", "t", "r");
        assert_eq!(store.session_count(), 1);

        assert!(store.clear_session("s1"));
        assert!(!store.clear_session("s1"));
        assert_eq!(store.session_count(), 0);
    }
}
