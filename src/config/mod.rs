use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::engine::DecisionTree;
use crate::error::{AppError, AppResult};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level and output format.
    pub logging: LoggingConfig,
    /// Diagnosis session lifecycle.
    pub sessions: SessionConfig,
    /// Decision tree source.
    pub tree: TreeConfig,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable output.
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Diagnosis session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle time after which a session is purged.
    pub ttl_secs: u64,
    /// Maximum number of live sessions.
    pub max_sessions: usize,
    /// Period of the background purge.
    pub sweep_interval_secs: u64,
}

/// Decision tree configuration
#[derive(Debug, Clone, Default)]
pub struct TreeConfig {
    /// Custom tree file; the built-in tree is used when unset.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let sessions = SessionConfig {
            ttl_secs: env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            max_sessions: env::var("SESSION_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(1000),
            sweep_interval_secs: env::var("SESSION_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &u64| *n > 0)
                .unwrap_or(300),
        };

        let tree = TreeConfig {
            path: env::var("DIAGNOSTIC_TREE_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        };

        Ok(Config {
            logging,
            sessions,
            tree,
        })
    }

    /// Load the configured decision tree, falling back to the built-in one.
    ///
    /// A configured path that cannot be read or fails validation is a
    /// configuration error.
    pub fn load_tree(&self) -> AppResult<DecisionTree> {
        match &self.tree.path {
            Some(path) => DecisionTree::load(path).map_err(|e| AppError::Config {
                message: format!(
                    "DIAGNOSTIC_TREE_PATH {} could not be loaded: {}",
                    path.display(),
                    e
                ),
            }),
            None => {
                let tree = DecisionTree::builtin()?;
                info!(nodes = tree.node_count(), "Using built-in decision tree");
                Ok(tree)
            }
        }
    }
}

impl SessionConfig {
    /// Idle time as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Sweep period as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            max_sessions: 1000,
            sweep_interval_secs: 300,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
            sessions: SessionConfig::default(),
            tree: TreeConfig::default(),
        }
    }
}
