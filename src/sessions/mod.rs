//! Diagnosis session state and the store that holds it.
//!
//! A session records one engineer's walk through the decision tree. Sessions
//! are keyed by an opaque token, live only in memory, and are written back
//! with a revision check so that two racing answers cannot both advance the
//! same session.

mod memory;

pub use memory::MemorySessionStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{Answer, MechanismResult};
use crate::error::StoreResult;

/// A single answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisStep {
    /// Node that was answered.
    pub node_id: String,
    /// Question text at the time it was answered.
    pub question: String,
    /// The answer given.
    pub answer: Answer,
}

/// Per-user traversal state of the decision tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisSession {
    /// Opaque session token.
    pub id: String,
    /// Steps taken so far, in order.
    pub steps: Vec<DiagnosisStep>,
    /// Node awaiting an answer; `None` once a mechanism is reached.
    pub current_node: Option<String>,
    /// Terminal diagnosis, if reached.
    pub result: Option<MechanismResult>,
    /// Incremented on every write.
    pub revision: u64,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last updated.
    pub updated_at: DateTime<Utc>,
}

impl DiagnosisSession {
    /// Create a new session positioned at `root`.
    pub fn new(root: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), root)
    }

    /// Create a session with a caller-chosen id, positioned at `root`.
    pub fn with_id(id: impl Into<String>, root: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            steps: Vec::new(),
            current_node: Some(root.into()),
            result: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a mechanism has been reached.
    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }
}

/// Storage for live diagnosis sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a session, replacing any existing session with the same id.
    async fn insert(&self, session: &DiagnosisSession) -> StoreResult<()>;

    /// Fetch a session by id.
    async fn get(&self, id: &str) -> StoreResult<Option<DiagnosisSession>>;

    /// Write back a modified session.
    ///
    /// Succeeds only if the stored revision still equals `expected_revision`;
    /// the stored copy then takes the revision carried by `session`.
    async fn save(&self, session: &DiagnosisSession, expected_revision: u64) -> StoreResult<()>;

    /// Remove a session. Returns whether it existed.
    async fn remove(&self, id: &str) -> StoreResult<bool>;

    /// Remove sessions not updated since `older_than`. Returns how many were removed.
    async fn purge_idle(&self, older_than: DateTime<Utc>) -> StoreResult<usize>;

    /// Number of live sessions.
    async fn len(&self) -> StoreResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_positioned_at_root() {
        let session = DiagnosisSession::new("q_root");
        assert_eq!(session.current_node.as_deref(), Some("q_root"));
        assert!(session.steps.is_empty());
        assert!(!session.is_complete());
        assert_eq!(session.revision, 0);
        assert!(Uuid::parse_str(&session.id).is_ok());
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = DiagnosisSession::new("q_root");
        let b = DiagnosisSession::new("q_root");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_with_id() {
        let session = DiagnosisSession::with_id("well-7", "q_root");
        assert_eq!(session.id, "well-7");
    }
}
