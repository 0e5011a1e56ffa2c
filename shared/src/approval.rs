//! Operator approval vote merging
//!
//! Two independent realtime sources (the direct operator index and the
//! tenant-embedded operator record) each publish a tri-state vote. The
//! merge is a pure reducer rather than mutable per-source cells, so the
//! published verdict is always recomputable from the latest votes.
//!
//! Precedence is fail-closed: an explicit deny from any source wins
//! over an approve; an approve wins over unknown; all-unknown denies.

use serde::{Deserialize, Serialize};

/// One source's opinion about the current operator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Vote {
    Approved,
    Denied,
    #[default]
    Unknown,
}

impl Vote {
    /// Vote from an optional `approved` flag (absent record = unknown)
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => Vote::Approved,
            Some(false) => Vote::Denied,
            None => Vote::Unknown,
        }
    }
}

/// Merge two source votes into the published verdict.
///
/// Explicit `Denied` wins over `Approved`; `Approved` wins over
/// `Unknown`; the all-unknown default is `false` (fail closed).
pub fn merge_votes(a: Vote, b: Vote) -> bool {
    if a == Vote::Denied || b == Vote::Denied {
        return false;
    }
    a == Vote::Approved || b == Vote::Approved
}

/// First non-null store id, in source-precedence order:
/// direct operator index, per-user index, fallback scan.
pub fn resolve_store_id(
    direct: Option<&str>,
    user_index: Option<&str>,
    fallback: Option<&str>,
) -> Option<String> {
    direct
        .or(user_index)
        .or(fallback)
        .map(|s| s.to_string())
}

/// Continuously-published approval verdict for the current identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ApprovalState {
    /// True until both sources have reported (or the fallback ran)
    pub loading: bool,
    pub approved: bool,
    #[serde(rename = "storeId", skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
}

impl ApprovalState {
    /// Initial state published on identity change
    pub fn loading() -> Self {
        Self { loading: true, approved: false, store_id: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_deny_wins() {
        assert!(!merge_votes(Vote::Denied, Vote::Approved));
        assert!(!merge_votes(Vote::Approved, Vote::Denied));
        assert!(!merge_votes(Vote::Denied, Vote::Unknown));
    }

    #[test]
    fn test_approve_wins_over_unknown() {
        assert!(merge_votes(Vote::Unknown, Vote::Approved));
        assert!(merge_votes(Vote::Approved, Vote::Unknown));
        assert!(merge_votes(Vote::Approved, Vote::Approved));
    }

    #[test]
    fn test_all_unknown_fails_closed() {
        assert!(!merge_votes(Vote::Unknown, Vote::Unknown));
    }

    #[test]
    fn test_store_id_precedence() {
        assert_eq!(
            resolve_store_id(Some("a"), Some("b"), Some("c")),
            Some("a".to_string())
        );
        assert_eq!(
            resolve_store_id(None, Some("b"), Some("c")),
            Some("b".to_string())
        );
        assert_eq!(resolve_store_id(None, None, Some("c")), Some("c".to_string()));
        assert_eq!(resolve_store_id(None, None, None), None);
    }
}
