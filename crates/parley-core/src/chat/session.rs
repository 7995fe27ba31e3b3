//! Session issuer.
//!
//! Stateless: ids are random and nothing is written until the first turn,
//! so an issued but unused session leaves no trace.

use parley_types::session::SessionId;

/// Produce a fresh session identifier.
pub fn issue_session_id() -> SessionId {
    SessionId::random()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_issued_ids_do_not_repeat() {
        let ids: HashSet<SessionId> = (0..1_000).map(|_| issue_session_id()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn test_issued_ids_pass_validation() {
        let id = issue_session_id();
        assert_eq!(SessionId::parse(id.as_str()).unwrap(), id);
    }
}
