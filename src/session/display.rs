//! Projection of session output into renderable messages
//!
//! The controller reports turns, errors and local notices; this module turns
//! each of them into a [`DisplayMessage`] with a presentation tone. Nothing
//! here feeds back into the conversation.

use crate::error::ApiError;
use crate::session::{Role, Turn};
use chrono::{DateTime, Local, Utc};

const WELCOME_TEXT: &str = "Hello! I'm your AI assistant for managing doctor procedures. You can ask me to:

  - Show procedure history for a doctor
  - Get cost quotes for procedures
  - Add new procedures

Try asking: \"Show me the history for Dr. Smith\" or \"What is the cost for procedure TEST001?\"";

const CONTEXT_CLEARED_TEXT: &str =
    "Conversation context cleared. Earlier messages will no longer be sent to the assistant.";

/// Local-only informational message
///
/// Notices are shown to the user but never stored in the conversation and
/// never sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Notice {
    pub fn new(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            content: content.into(),
            timestamp,
        }
    }

    /// Greeting shown when a chat session starts
    pub fn welcome(timestamp: DateTime<Utc>) -> Self {
        Self::new(WELCOME_TEXT, timestamp)
    }

    /// Acknowledgement emitted by `clear_context`
    pub fn context_cleared(timestamp: DateTime<Utc>) -> Self {
        Self::new(CONTEXT_CLEARED_TEXT, timestamp)
    }
}

/// Presentation annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
    Neutral,
}

/// A message ready to be rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    pub speaker: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub tone: Tone,
}

impl DisplayMessage {
    /// Projects a conversation turn
    ///
    /// Assistant replies are successes unless the backend flagged them as
    /// general conversation (`intent_mapped == Some(false)`).
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::Utc;
    /// use procassist::session::{DisplayMessage, Tone, Turn};
    ///
    /// let turn = Turn::assistant("Dr. Smith has 3 procedures", Some(true), Utc::now());
    /// assert_eq!(DisplayMessage::from_turn(&turn).tone, Tone::Success);
    ///
    /// let chit_chat = Turn::assistant("Hello!", Some(false), Utc::now());
    /// assert_eq!(DisplayMessage::from_turn(&chit_chat).tone, Tone::Neutral);
    /// ```
    pub fn from_turn(turn: &Turn) -> Self {
        let tone = match (turn.role, turn.intent_mapped) {
            (Role::User, _) => Tone::Neutral,
            (Role::Assistant, Some(false)) => Tone::Neutral,
            (Role::Assistant, _) => Tone::Success,
        };

        Self {
            speaker: turn.role,
            content: turn.content.clone(),
            timestamp: turn.timestamp,
            tone,
        }
    }

    /// Projects a failed exchange as an inline assistant error
    pub fn from_error(error: &ApiError, timestamp: DateTime<Utc>) -> Self {
        Self {
            speaker: Role::Assistant,
            content: format!("Sorry, I encountered an error: {}", error),
            timestamp,
            tone: Tone::Error,
        }
    }

    /// Projects a local notice
    pub fn from_notice(notice: &Notice) -> Self {
        Self {
            speaker: Role::Assistant,
            content: notice.content.clone(),
            timestamp: notice.timestamp,
            tone: Tone::Neutral,
        }
    }

    /// Local wall-clock time as `HH:MM`
    pub fn local_time(&self) -> String {
        self.timestamp.with_timezone(&Local).format("%H:%M").to_string()
    }

    pub fn is_error(&self) -> bool {
        self.tone == Tone::Error
    }
}
