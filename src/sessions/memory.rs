use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{DiagnosisSession, SessionStore};
use crate::error::{StoreError, StoreResult};

/// In-memory session store, bounded by a maximum session count.
///
/// When full, inserting a new session evicts the least recently updated one.
#[derive(Clone)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, DiagnosisSession>>>,
    max_sessions: usize,
}

impl MemorySessionStore {
    /// Create a store holding at most `max_sessions` sessions.
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_sessions: max_sessions.max(1),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: &DiagnosisSession) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;

        if !sessions.contains_key(&session.id) && sessions.len() >= self.max_sessions {
            let oldest = sessions
                .values()
                .min_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)))
                .map(|s| s.id.clone());
            if let Some(id) = oldest {
                warn!(session_id = %id, max = self.max_sessions, "Session limit reached, evicting");
                sessions.remove(&id);
            }
        }

        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<DiagnosisSession>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn save(&self, session: &DiagnosisSession, expected_revision: u64) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions
            .get_mut(&session.id)
            .ok_or_else(|| StoreError::NotFound {
                session_id: session.id.clone(),
            })?;

        if stored.revision != expected_revision {
            return Err(StoreError::Conflict {
                session_id: session.id.clone(),
                expected: expected_revision,
                actual: stored.revision,
            });
        }

        *stored = session.clone();
        Ok(())
    }

    async fn remove(&self, id: &str) -> StoreResult<bool> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn purge_idle(&self, older_than: DateTime<Utc>) -> StoreResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.updated_at >= older_than);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "Purged idle diagnosis sessions");
        }
        Ok(removed)
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.sessions.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemorySessionStore::default();
        let session = DiagnosisSession::new("q_root");
        store.insert(&session).await.unwrap();

        let fetched = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, session.id);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_requires_matching_revision() {
        let store = MemorySessionStore::default();
        let mut session = DiagnosisSession::new("q_root");
        store.insert(&session).await.unwrap();

        session.revision = 1;
        store.save(&session, 0).await.unwrap();

        // A second writer still holding revision 0 loses.
        let err = store.save(&session, 0).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                expected: 0,
                actual: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_save_unknown_session() {
        let store = MemorySessionStore::default();
        let session = DiagnosisSession::new("q_root");
        let err = store.save(&session, 0).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_insert_evicts_least_recently_updated() {
        let store = MemorySessionStore::new(2);
        let mut old = DiagnosisSession::new("q_root");
        old.updated_at = Utc::now() - Duration::hours(1);
        let newer = DiagnosisSession::new("q_root");
        store.insert(&old).await.unwrap();
        store.insert(&newer).await.unwrap();

        let third = DiagnosisSession::new("q_root");
        store.insert(&third).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 2);
        assert!(store.get(&old.id).await.unwrap().is_none());
        assert!(store.get(&newer.id).await.unwrap().is_some());
        assert!(store.get(&third.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reinsert_same_id_does_not_evict() {
        let store = MemorySessionStore::new(1);
        let session = DiagnosisSession::new("q_root");
        store.insert(&session).await.unwrap();
        store.insert(&session).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_idle() {
        let store = MemorySessionStore::default();
        let mut stale = DiagnosisSession::new("q_root");
        stale.updated_at = Utc::now() - Duration::hours(2);
        let fresh = DiagnosisSession::new("q_root");
        store.insert(&stale).await.unwrap();
        store.insert(&fresh).await.unwrap();

        let removed = store
            .purge_idle(Utc::now() - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.get(&fresh.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemorySessionStore::default();
        let session = DiagnosisSession::new("q_root");
        store.insert(&session).await.unwrap();
        assert!(store.remove(&session.id).await.unwrap());
        assert!(!store.remove(&session.id).await.unwrap());
    }
}
