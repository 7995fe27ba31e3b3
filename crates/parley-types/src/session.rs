//! Session identifier type.
//!
//! A session has no stored row of its own: it is the grouping key over
//! turns, created implicitly by the first turn written under it.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ChatError;

/// Longest accepted session identifier, in characters.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Opaque identifier grouping the turns of one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a fresh random identifier (UUID v4).
    pub fn random() -> Self {
        SessionId(Uuid::new_v4().to_string())
    }

    /// Validate a caller-supplied identifier.
    ///
    /// Surrounding whitespace is trimmed. Blank or over-long values are
    /// rejected; anything else is accepted, whether or not turns exist for it.
    pub fn parse(raw: &str) -> Result<Self, ChatError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ChatError::InvalidRequest(
                "session_id must not be empty".to_string(),
            ));
        }
        if trimmed.chars().count() > MAX_SESSION_ID_LEN {
            return Err(ChatError::InvalidRequest(format!(
                "session_id must be at most {MAX_SESSION_ID_LEN} characters"
            )));
        }
        Ok(SessionId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_are_uuids_and_distinct() {
        let a = SessionId::random();
        let b = SessionId::random();
        assert_ne!(a, b);
        let parsed = Uuid::parse_str(a.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let id = SessionId::parse("  abc-123 \n").unwrap();
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(matches!(
            SessionId::parse("   "),
            Err(ChatError::InvalidRequest(_))
        ));
        assert!(SessionId::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_overlong() {
        let long = "x".repeat(MAX_SESSION_ID_LEN + 1);
        assert!(SessionId::parse(&long).is_err());
        let max = "x".repeat(MAX_SESSION_ID_LEN);
        assert!(SessionId::parse(&max).is_ok());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&SessionId("abc".to_string())).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
