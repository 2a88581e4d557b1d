//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - Shared application state management
//! - Idle session sweeping

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::engine::{Classifier, DecisionTree};
use crate::error::{AppResult, StoreResult};
use crate::sessions::{MemorySessionStore, SessionStore};

/// Application state shared across handlers.
///
/// Holds the decision tree, the session store and the classifier that
/// drives diagnoses over them. The stateless operations need nothing here.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Live diagnosis sessions.
    pub sessions: Arc<dyn SessionStore>,
    /// Interactive mechanism classifier.
    pub classifier: Classifier,
}

impl AppState {
    /// Create application state with an in-memory session store.
    pub fn new(config: Config, tree: DecisionTree) -> Self {
        let store: Arc<dyn SessionStore> =
            Arc::new(MemorySessionStore::new(config.sessions.max_sessions));
        Self::with_store(config, tree, store)
    }

    /// Create application state over an existing session store.
    pub fn with_store(config: Config, tree: DecisionTree, store: Arc<dyn SessionStore>) -> Self {
        info!(
            root = %tree.root_id(),
            nodes = tree.node_count(),
            depth = tree.depth(),
            max_sessions = config.sessions.max_sessions,
            "AppState initializing"
        );
        let classifier = Classifier::new(Arc::new(tree), Arc::clone(&store));
        Self {
            config,
            sessions: store,
            classifier,
        }
    }

    /// Load the configured tree and build state from it.
    pub fn from_config(config: Config) -> AppResult<Self> {
        let tree = config.load_tree()?;
        Ok(Self::new(config, tree))
    }

    /// Purge sessions idle for longer than `ttl`.
    pub async fn purge_idle_sessions(&self, ttl: Duration) -> StoreResult<usize> {
        let cutoff = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_sub_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.sessions.purge_idle(cutoff).await
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;

/// Spawn the background task that periodically purges idle sessions.
pub fn spawn_session_sweeper(state: SharedState) -> JoinHandle<()> {
    let ttl = state.config.sessions.ttl();
    let period = state.config.sessions.sweep_interval();
    info!(
        ttl_secs = ttl.as_secs(),
        interval_secs = period.as_secs(),
        "Session sweeper started"
    );

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // First tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            match state.purge_idle_sessions(ttl).await {
                Ok(purged) => debug!(purged, "Session sweep"),
                Err(e) => warn!(error = %e, "Session sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StartParams;

    fn create_test_state() -> AppState {
        let config = Config::default();
        let tree = DecisionTree::builtin().unwrap();
        AppState::new(config, tree)
    }

    #[tokio::test]
    async fn test_app_state_new() {
        let state = create_test_state();
        assert_eq!(state.classifier.tree().root_id(), "q_circulation");
        assert_eq!(state.sessions.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_app_state_clone_shares_sessions() {
        let state1 = create_test_state();
        let state2 = state1.clone();

        state1
            .classifier
            .start(StartParams { session_id: None })
            .await
            .unwrap();
        assert_eq!(state2.sessions.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_shared_state_type() {
        let shared: SharedState = Arc::new(create_test_state());
        let shared2 = Arc::clone(&shared);
        assert_eq!(Arc::strong_count(&shared), 2);
        drop(shared2);
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[tokio::test]
    async fn test_purge_idle_sessions() {
        let state = create_test_state();
        state
            .classifier
            .start(StartParams { session_id: None })
            .await
            .unwrap();

        assert_eq!(
            state.purge_idle_sessions(Duration::from_secs(3600)).await.unwrap(),
            0
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(state.purge_idle_sessions(Duration::ZERO).await.unwrap(), 1);
        assert_eq!(state.sessions.len().await.unwrap(), 0);
    }

    #[test]
    fn test_from_config_builtin() {
        let state = AppState::from_config(Config::default()).unwrap();
        assert_eq!(state.config.sessions.max_sessions, 1000);
    }
}
