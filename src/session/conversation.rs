//! Bounded conversation log
//!
//! [`ConversationStore`] keeps the most recent turns of a conversation in
//! append order. When an append would exceed the capacity, the oldest turns
//! are dropped first. It performs no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Maximum number of turns kept as conversation context (about 20 exchanges)
pub const HISTORY_CAPACITY: usize = 40;

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One contribution to the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Set only on assistant turns; `Some(false)` means general conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_mapped: Option<bool>,
}

impl Turn {
    /// Creates a user turn
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::Utc;
    /// use procassist::session::{Role, Turn};
    ///
    /// let turn = Turn::user("Show me the history for Dr. Smith", Utc::now());
    /// assert_eq!(turn.role, Role::User);
    /// assert_eq!(turn.intent_mapped, None);
    /// ```
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp,
            intent_mapped: None,
        }
    }

    /// Creates an assistant turn
    pub fn assistant(
        content: impl Into<String>,
        intent_mapped: Option<bool>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp,
            intent_mapped,
        }
    }
}

/// Capacity-bounded, append-only conversation log
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use procassist::session::{ConversationStore, Turn, HISTORY_CAPACITY};
///
/// let mut store = ConversationStore::new();
/// for i in 0..(HISTORY_CAPACITY + 1) {
///     store.append(Turn::user(format!("message {}", i), Utc::now()));
/// }
/// assert_eq!(store.len(), HISTORY_CAPACITY);
/// assert_eq!(store.snapshot()[0].content, "message 1");
/// ```
#[derive(Debug, Clone)]
pub struct ConversationStore {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl ConversationStore {
    /// Creates an empty store holding at most [`HISTORY_CAPACITY`] turns
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Creates an empty store with a custom bound (at least one turn)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a turn at the tail, trimming the oldest turns past capacity
    ///
    /// A turn stamped earlier than the current tail is re-stamped with the
    /// tail's timestamp so the log stays non-decreasing in time.
    pub fn append(&mut self, mut turn: Turn) {
        if let Some(last) = self.turns.back() {
            if turn.timestamp < last.timestamp {
                turn.timestamp = last.timestamp;
            }
        }

        self.turns.push_back(turn);
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
    }

    /// Removes every turn; calling it on an empty store is a no-op
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Owned copy of the log, oldest first
    ///
    /// Later changes to the store are never visible through a snapshot.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    /// Borrowing iterator over the log, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Turn> + '_ {
        self.turns.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.back()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of turns authored by `role`
    pub fn count_role(&self, role: Role) -> usize {
        self.turns.iter().filter(|t| t.role == role).count()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn user_turn(i: usize) -> Turn {
        Turn::user(format!("turn {}", i), at(i as i64))
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = ConversationStore::new();
        assert!(store.is_empty());
        assert_eq!(store.capacity(), HISTORY_CAPACITY);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_append_keeps_order() {
        let mut store = ConversationStore::new();
        store.append(Turn::user("hello", at(0)));
        store.append(Turn::assistant("hi", Some(true), at(1)));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].role, Role::User);
        assert_eq!(snapshot[1].role, Role::Assistant);
        assert_eq!(snapshot[1].intent_mapped, Some(true));
    }

    #[test]
    fn test_bound_holds_after_every_append() {
        let mut store = ConversationStore::new();
        for n in 1..=100 {
            store.append(user_turn(n));
            assert!(store.len() <= HISTORY_CAPACITY);

            let expected: Vec<String> = ((n.saturating_sub(HISTORY_CAPACITY) + 1)..=n)
                .map(|i| format!("turn {}", i))
                .collect();
            let actual: Vec<String> = store.iter().map(|t| t.content.clone()).collect();
            assert_eq!(actual, expected, "mismatch after {} appends", n);
        }
    }

    #[test]
    fn test_41st_append_drops_oldest() {
        let mut store = ConversationStore::new();
        for i in 0..HISTORY_CAPACITY {
            store.append(user_turn(i));
        }
        assert_eq!(store.len(), HISTORY_CAPACITY);

        store.append(user_turn(HISTORY_CAPACITY));

        assert_eq!(store.len(), HISTORY_CAPACITY);
        assert_eq!(store.get(0).unwrap().content, "turn 1");
        assert_eq!(
            store.last().unwrap().content,
            format!("turn {}", HISTORY_CAPACITY)
        );
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut store = ConversationStore::new();
        store.append(user_turn(0));
        store.clear();
        assert!(store.snapshot().is_empty());
        store.clear();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_mutation() {
        let mut store = ConversationStore::new();
        store.append(user_turn(0));
        let snapshot = store.snapshot();

        store.append(user_turn(1));
        store.clear();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].content, "turn 0");
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let mut store = ConversationStore::new();
        store.append(Turn::user("late", at(10)));
        store.append(Turn::assistant("early", None, at(5)));

        let snapshot = store.snapshot();
        assert_eq!(snapshot[1].timestamp, at(10));
        assert!(snapshot.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut store = ConversationStore::new();
        store.append(Turn::user("same", at(0)));
        store.append(Turn::user("same", at(0)));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_count_role() {
        let mut store = ConversationStore::new();
        store.append(Turn::user("a", at(0)));
        store.append(Turn::assistant("b", None, at(1)));
        store.append(Turn::user("c", at(2)));
        assert_eq!(store.count_role(Role::User), 2);
        assert_eq!(store.count_role(Role::Assistant), 1);
    }

    #[test]
    fn test_with_capacity_minimum_is_one() {
        let mut store = ConversationStore::with_capacity(0);
        store.append(user_turn(0));
        store.append(user_turn(1));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().content, "turn 1");
    }
}
