//! Turn types: one role-tagged message within a session.
//!
//! Turns are append-only. Within a session they replay in timestamp order,
//! with the store-assigned `id` breaking ties.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::{Message, MessageRole};
use crate::session::SessionId;

/// A stored turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: i64,
    pub session_id: SessionId,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Persona mood in effect when the turn was written.
    pub mood: Option<String>,
}

impl Turn {
    /// The `{role, content}` pair sent to the completion provider.
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// A turn about to be appended (no id yet).
#[derive(Debug, Clone, PartialEq)]
pub struct NewTurn {
    pub session_id: SessionId,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub mood: Option<String>,
}

impl NewTurn {
    /// Build a turn stamped with the current time.
    pub fn now(
        session_id: SessionId,
        role: MessageRole,
        content: impl Into<String>,
        mood: Option<String>,
    ) -> Self {
        Self {
            session_id,
            role,
            content: content.into(),
            timestamp: Utc::now(),
            mood,
        }
    }

    pub fn into_turn(self, id: i64) -> Turn {
        Turn {
            id,
            session_id: self.session_id,
            role: self.role,
            content: self.content,
            timestamp: self.timestamp,
            mood: self.mood,
        }
    }
}

/// A row of the legacy narrow schema `(session_id, message, is_user)`.
///
/// `message` is nullable in the legacy table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyMessage {
    pub session_id: String,
    pub message: Option<String>,
    pub is_user: bool,
}

impl LegacyMessage {
    /// Map onto the canonical schema: `is_user` selects user vs assistant.
    ///
    /// The session id goes through [`SessionId::parse`], so padding is
    /// trimmed. Returns `None` for an id `parse` rejects or a NULL message.
    pub fn into_new_turn(self, timestamp: DateTime<Utc>) -> Option<NewTurn> {
        let session_id = SessionId::parse(&self.session_id).ok()?;
        let content = self.message?;
        let role = if self.is_user {
            MessageRole::User
        } else {
            MessageRole::Assistant
        };
        Some(NewTurn {
            session_id,
            role,
            content,
            timestamp,
            mood: None,
        })
    }
}

/// Outcome of a legacy table import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegacyImport {
    pub imported: u64,
    /// Rows left out for an unusable session id or a NULL message.
    pub skipped: u64,
}
