//! Session module - bounded per-session conversation memory
//!
//! Each session key owns an ordered log of messages. The log only grows at the
//! back and is trimmed from the front once it exceeds the configured maximum,
//! so the same history length always yields the same retained window.
//!
//! # Example
//!
//! ```
//! use chatline::session::{ConversationMemory, Message};
//!
//! #[tokio::main]
//! async fn main() {
//!     let memory = ConversationMemory::new(2);
//!     memory.append("s1", Message::user("one")).await.unwrap();
//!     memory.append("s1", Message::user("two")).await.unwrap();
//!     memory.append("s1", Message::user("three")).await.unwrap();
//!
//!     let history = memory.read("s1").await.unwrap();
//!     assert_eq!(history.len(), 2);
//!     assert_eq!(history[0].content, "two");
//! }
//! ```

pub mod types;

pub use types::{Message, Role, ToolCall};

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::Result;

/// Default number of messages retained per session.
pub const DEFAULT_MAX_MESSAGES: usize = 100;

/// One conversation's retained messages.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session key (e.g. a cookie-backed id)
    pub key: String,
    /// Retained messages, oldest first
    pub messages: VecDeque<Message>,
    /// When the first message arrived
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            messages: VecDeque::new(),
            created_at: Utc::now(),
        }
    }

    /// Push to the back, then drop from the front until within `max`.
    /// Returns how many messages were evicted.
    fn push_bounded(&mut self, message: Message, max: usize) -> usize {
        self.messages.push_back(message);
        let mut evicted = 0;
        while self.messages.len() > max {
            self.messages.pop_front();
            evicted += 1;
        }
        evicted
    }
}

type SessionSlot = Arc<Mutex<Session>>;

/// In-memory conversation store keyed by session.
///
/// # Thread Safety
///
/// The outer map is behind an `RwLock` that is only held long enough to find
/// or create a session slot. Each slot has its own `Mutex`, so appends on one
/// key are serialized while different keys never contend.
///
/// Two turns running concurrently on the same key may interleave their
/// messages; each individual append is still atomic.
pub struct ConversationMemory {
    sessions: RwLock<HashMap<String, SessionSlot>>,
    max_messages: usize,
}

impl ConversationMemory {
    /// Create a memory that retains at most `max_messages` per session.
    ///
    /// A bound of zero is raised to one so the newest message is always kept.
    pub fn new(max_messages: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_messages: max_messages.max(1),
        }
    }

    /// The per-session retention bound.
    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    async fn slot(&self, key: &str) -> SessionSlot {
        {
            let sessions = self.sessions.read().await;
            if let Some(slot) = sessions.get(key) {
                return Arc::clone(slot);
            }
        }

        let mut sessions = self.sessions.write().await;
        Arc::clone(
            sessions
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Session::new(key)))),
        )
    }

    /// Append `message` to the end of the session, evicting the oldest
    /// messages if the bound is exceeded. Creates the session lazily.
    pub async fn append(&self, key: &str, message: Message) -> Result<()> {
        let slot = self.slot(key).await;
        let mut session = slot.lock().await;
        let role = message.role;
        let evicted = session.push_bounded(message, self.max_messages);
        debug!(
            session = %key,
            role = %role,
            retained = session.messages.len(),
            evicted,
            "Appended message"
        );
        Ok(())
    }

    /// Snapshot of the session's messages, oldest first.
    ///
    /// Unknown keys yield an empty history without creating a session.
    pub async fn read(&self, key: &str) -> Result<Vec<Message>> {
        let slot = {
            let sessions = self.sessions.read().await;
            match sessions.get(key) {
                Some(slot) => Arc::clone(slot),
                None => return Ok(Vec::new()),
            }
        };
        let session = slot.lock().await;
        Ok(session.messages.iter().cloned().collect())
    }

    /// Number of retained messages for `key`.
    pub async fn len(&self, key: &str) -> usize {
        let slot = {
            let sessions = self.sessions.read().await;
            match sessions.get(key) {
                Some(slot) => Arc::clone(slot),
                None => return 0,
            }
        };
        let len = slot.lock().await.messages.len();
        len
    }

    /// Number of sessions created so far.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_unknown_session_is_empty() {
        let memory = ConversationMemory::default();
        assert!(memory.read("missing").await.unwrap().is_empty());
        assert_eq!(memory.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_append_creates_session_lazily() {
        let memory = ConversationMemory::default();
        memory.append("a", Message::user("hi")).await.unwrap();
        assert_eq!(memory.session_count().await, 1);
        assert_eq!(memory.len("a").await, 1);
    }

    #[tokio::test]
    async fn test_fifo_eviction_keeps_suffix_in_order() {
        let memory = ConversationMemory::new(3);
        for i in 0..7 {
            memory
                .append("s", Message::user(&format!("m{}", i)))
                .await
                .unwrap();
        }
        let contents: Vec<_> = memory
            .read("s")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["m4", "m5", "m6"]);
    }

    #[tokio::test]
    async fn test_length_is_min_of_appends_and_bound() {
        for n in [0usize, 1, 4, 5, 6, 20] {
            let memory = ConversationMemory::new(5);
            for i in 0..n {
                memory
                    .append("s", Message::user(&i.to_string()))
                    .await
                    .unwrap();
            }
            assert_eq!(memory.len("s").await, n.min(5), "n = {}", n);
        }
    }

    #[tokio::test]
    async fn test_snapshot_is_not_affected_by_later_appends() {
        let memory = ConversationMemory::new(2);
        memory.append("s", Message::user("a")).await.unwrap();
        let snapshot = memory.read("s").await.unwrap();

        memory.append("s", Message::user("b")).await.unwrap();
        memory.append("s", Message::user("c")).await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].content, "a");
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let memory = ConversationMemory::new(2);
        memory.append("a", Message::user("a1")).await.unwrap();
        for i in 0..10 {
            memory
                .append("b", Message::user(&format!("b{}", i)))
                .await
                .unwrap();
        }
        let a = memory.read("a").await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].content, "a1");
    }

    #[tokio::test]
    async fn test_zero_bound_is_raised_to_one() {
        let memory = ConversationMemory::new(0);
        assert_eq!(memory.max_messages(), 1);
        memory.append("s", Message::user("x")).await.unwrap();
        memory.append("s", Message::user("y")).await.unwrap();
        let history = memory.read("s").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "y");
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let memory = Arc::new(ConversationMemory::new(1000));
        let mut handles = Vec::new();
        for t in 0..8 {
            let memory = Arc::clone(&memory);
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    memory
                        .append("shared", Message::user(&format!("{}-{}", t, i)))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(memory.len("shared").await, 200);
    }
}
