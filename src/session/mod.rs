//! In-memory conversation session store.
//!
//! Process-wide map from session identifier to ordered message history,
//! capped to the most recently created sessions. Eviction is
//! insertion-ordered: when a new identifier would exceed the cap, the
//! oldest-created session is dropped. Histories are append-only and live
//! only for the lifetime of the process.

use crate::ai::Message;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

pub const DEFAULT_MAX_SESSIONS: usize = 100;

pub struct SessionStore {
    inner: Mutex<Sessions>,
    capacity: usize,
}

struct Sessions {
    histories: HashMap<String, Vec<Message>>,
    /// Session ids in creation order; front is oldest.
    order: VecDeque<String>,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Sessions {
                histories: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of a session's history; empty for unknown identifiers.
    pub fn history(&self, session_id: &str) -> Vec<Message> {
        self.inner
            .lock()
            .histories
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.inner.lock().histories.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a message, creating the session on first reference and
    /// evicting the oldest-created session when over capacity.
    pub fn append(&self, session_id: &str, message: Message) {
        let mut inner = self.inner.lock();
        self.append_locked(&mut inner, session_id, message);
    }

    /// Append several messages in one lock acquisition, so a concurrent
    /// reader never observes a half-written exchange.
    pub fn append_all(&self, session_id: &str, messages: impl IntoIterator<Item = Message>) {
        let mut inner = self.inner.lock();
        for message in messages {
            self.append_locked(&mut inner, session_id, message);
        }
    }

    fn append_locked(&self, inner: &mut Sessions, session_id: &str, message: Message) {
        if !inner.histories.contains_key(session_id) {
            while inner.histories.len() >= self.capacity {
                if let Some(oldest) = inner.order.pop_front() {
                    debug!("Evicting oldest session: {}", oldest);
                    inner.histories.remove(&oldest);
                } else {
                    break;
                }
            }
            inner.order.push_back(session_id.to_string());
            inner.histories.insert(session_id.to_string(), Vec::new());
        }

        if let Some(history) = inner.histories.get_mut(session_id) {
            history.push(message);
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_append() {
        let store = SessionStore::new(10);
        assert!(store.history("a").is_empty());

        store.append("a", Message::user("hello"));
        store.append("a", Message::assistant("hi"));

        let history = store.history("a");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].content, "hi");
    }

    #[test]
    fn test_oldest_inserted_session_is_evicted() {
        let store = SessionStore::new(100);
        // "zzz" first: lexicographic eviction would remove the wrong entry.
        store.append("zzz", Message::user("first"));
        for i in 0..100 {
            store.append(&format!("s{i}"), Message::user("x"));
        }

        assert_eq!(store.len(), 100);
        assert!(!store.contains("zzz"));
        assert!(store.contains("s0"));
        assert!(store.contains("s99"));
    }

    #[test]
    fn test_existing_session_does_not_trigger_eviction() {
        let store = SessionStore::new(2);
        store.append("a", Message::user("1"));
        store.append("b", Message::user("1"));
        store.append("a", Message::user("2"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.history("a").len(), 2);
    }

    #[test]
    fn test_append_all_keeps_order_and_evicts() {
        let store = SessionStore::new(2);
        store.append("a", Message::user("1"));
        store.append("b", Message::user("1"));

        store.append_all(
            "c",
            [Message::user("question"), Message::assistant("answer")],
        );

        // Creating "c" evicted the oldest session, and the batch landed
        // in order.
        assert!(!store.contains("a"));
        let history = store.history("c");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "question");
        assert_eq!(history[1].content, "answer");
    }

    #[test]
    fn test_eviction_order_across_many_inserts() {
        let store = SessionStore::new(3);
        for id in ["a", "b", "c", "d", "e"] {
            store.append(id, Message::user("x"));
        }
        assert!(!store.contains("a"));
        assert!(!store.contains("b"));
        assert!(store.contains("c"));
        assert!(store.contains("d"));
        assert!(store.contains("e"));
    }
}
