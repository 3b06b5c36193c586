//! Bounded conversation history
//!
//! Holds the turns sent to the chat backend. The oldest turns are evicted
//! first once the cap is reached.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Speaker of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person talking to the assistant
    User,
    /// The assistant's reply
    Assistant,
}

impl Role {
    /// Wire name used by chat completion APIs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who spoke
    pub role: Role,
    /// What was said
    pub text: String,
}

impl Turn {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Ordered, capped sequence of turns
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<Turn>,
    cap: usize,
}

impl ConversationHistory {
    /// Create an empty history holding at most `cap` turns (minimum 1)
    #[must_use]
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            turns: VecDeque::with_capacity(cap),
            cap,
        }
    }

    /// Append a turn, evicting from the front when over the cap
    pub fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.cap {
            if let Some(evicted) = self.turns.pop_front() {
                tracing::trace!(role = evicted.role.as_str(), "evicted oldest turn");
            }
        }
    }

    /// Turns this history would hold after pushing `next`, without pushing it
    pub fn with_pending<'a>(&'a self, next: &'a Turn) -> impl Iterator<Item = &'a Turn> {
        let overflow = (self.turns.len() + 1).saturating_sub(self.cap);
        self.turns.iter().skip(overflow).chain(std::iter::once(next))
    }

    /// Drop every turn
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Newest turn, if any
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.back()
    }

    /// Number of stored turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turns are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Configured cap
    #[must_use]
    pub const fn cap(&self) -> usize {
        self.cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_within_cap() {
        let mut history = ConversationHistory::new(4);
        history.push(Turn::user("hi"));
        history.push(Turn::assistant("hello"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.last(), Some(&Turn::assistant("hello")));
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut history = ConversationHistory::new(3);
        for i in 0..5 {
            history.push(Turn::user(format!("turn {i}")));
        }

        assert_eq!(history.len(), 3);
        let texts: Vec<&str> = history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["turn 2", "turn 3", "turn 4"]);
    }

    #[test]
    fn test_never_exceeds_cap() {
        let mut history = ConversationHistory::new(7);
        for i in 0..50 {
            if i % 2 == 0 {
                history.push(Turn::user(i.to_string()));
            } else {
                history.push(Turn::assistant(i.to_string()));
            }
            assert!(history.len() <= 7);
        }
    }

    #[test]
    fn test_with_pending_leaves_history_untouched() {
        let mut history = ConversationHistory::new(2);
        history.push(Turn::user("first"));
        history.push(Turn::assistant("r1"));

        let next = Turn::user("second");
        let window: Vec<&Turn> = history.with_pending(&next).collect();
        assert_eq!(window, [&Turn::assistant("r1"), &Turn::user("second")]);

        let kept: Vec<&Turn> = history.iter().collect();
        assert_eq!(kept, [&Turn::user("first"), &Turn::assistant("r1")]);
    }

    #[test]
    fn test_clear() {
        let mut history = ConversationHistory::new(10);
        for _ in 0..10 {
            history.push(Turn::user("x"));
        }
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_zero_cap_is_clamped() {
        let mut history = ConversationHistory::new(0);
        history.push(Turn::user("a"));
        history.push(Turn::user("b"));
        assert_eq!(history.cap(), 1);
        assert_eq!(history.last().map(|t| t.text.as_str()), Some("b"));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Turn::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","text":"ok"}"#);
    }
}
