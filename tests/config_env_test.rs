//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Config::from_env() also loads a .env file
//! via dotenvy, so each test sets the variables it checks.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use std::env;
use std::io::Write;

use serial_test::serial;
use stuckpipe_engine::config::{Config, LogFormat};
use stuckpipe_engine::error::AppError;

fn clear(keys: &[&str]) {
    for key in keys {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_config_defaults() {
    clear(&[
        "SESSION_TTL_SECS",
        "SESSION_MAX",
        "SESSION_SWEEP_INTERVAL_SECS",
        "DIAGNOSTIC_TREE_PATH",
    ]);

    let config = Config::from_env().unwrap();
    assert_eq!(config.sessions.ttl_secs, 3600);
    assert_eq!(config.sessions.max_sessions, 1000);
    assert_eq!(config.sessions.sweep_interval_secs, 300);
    assert!(config.tree.path.is_none());
}

#[test]
#[serial]
fn test_config_session_overrides() {
    env::set_var("SESSION_TTL_SECS", "60");
    env::set_var("SESSION_MAX", "5");
    env::set_var("SESSION_SWEEP_INTERVAL_SECS", "10");

    let config = Config::from_env().unwrap();
    assert_eq!(config.sessions.ttl_secs, 60);
    assert_eq!(config.sessions.max_sessions, 5);
    assert_eq!(config.sessions.sweep_interval_secs, 10);

    clear(&["SESSION_TTL_SECS", "SESSION_MAX", "SESSION_SWEEP_INTERVAL_SECS"]);
}

#[test]
#[serial]
fn test_config_invalid_numbers_fall_back() {
    env::set_var("SESSION_TTL_SECS", "an hour");
    env::set_var("SESSION_MAX", "0");

    let config = Config::from_env().unwrap();
    assert_eq!(config.sessions.ttl_secs, 3600);
    assert_eq!(config.sessions.max_sessions, 1000);

    clear(&["SESSION_TTL_SECS", "SESSION_MAX"]);
}

#[test]
#[serial]
fn test_config_log_format() {
    env::set_var("LOG_FORMAT", "JSON");
    assert_eq!(Config::from_env().unwrap().logging.format, LogFormat::Json);

    env::set_var("LOG_FORMAT", "anything-else");
    assert_eq!(Config::from_env().unwrap().logging.format, LogFormat::Pretty);

    env::remove_var("LOG_FORMAT");
}

#[test]
#[serial]
fn test_config_log_level() {
    env::set_var("LOG_LEVEL", "debug");
    assert_eq!(Config::from_env().unwrap().logging.level, "debug");
    env::remove_var("LOG_LEVEL");
}

#[test]
#[serial]
fn test_config_custom_tree_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"root": "q", "nodes": [{{"node_id": "q", "question": "Rotating?", "yes": {{"mechanism": "Key Seating"}}, "no": {{"mechanism": "Undergauge Hole"}}}}]}}"#
    )
    .unwrap();
    env::set_var("DIAGNOSTIC_TREE_PATH", file.path());

    let config = Config::from_env().unwrap();
    let tree = config.load_tree().unwrap();
    assert_eq!(tree.root_id(), "q");
    assert_eq!(tree.node_count(), 1);

    env::remove_var("DIAGNOSTIC_TREE_PATH");
}

#[test]
#[serial]
fn test_config_bad_tree_path_is_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"root": "missing", "nodes": []}}"#).unwrap();
    env::set_var("DIAGNOSTIC_TREE_PATH", file.path());

    let config = Config::from_env().unwrap();
    let err = config.load_tree().unwrap_err();
    assert!(matches!(err, AppError::Config { .. }));

    env::remove_var("DIAGNOSTIC_TREE_PATH");
}
