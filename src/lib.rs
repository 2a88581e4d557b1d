//! # Stuck-Pipe Diagnostic Engine
//!
//! A Model Context Protocol (MCP) server that helps drilling engineers
//! diagnose, quantify, and document stuck-pipe events.
//!
//! ## Features
//!
//! - **Mechanism Classification**: Interactive yes/no decision tree over eight sticking mechanisms
//! - **Free Point**: Stretch-method free-point depth with pull-safety check
//! - **Risk Scoring**: Probability x severity with weighted contributing factors
//! - **Root-Cause Analysis**: 5-Whys and fishbone (6M) audit and report generation
//! - **Action Plans**: Immediate, short-term, and contingency actions per mechanism
//!
//! ## Architecture
//!
//! ```text
//! MCP Client → MCP Server (stdio) → Engine
//!                    ↓
//!           Session store (memory)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use stuckpipe_engine::{AppState, Config, McpServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let state = Arc::new(AppState::from_config(config)?);
//!     let server = McpServer::new(state);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Command-line interface.
pub mod cli;
/// Configuration management for the MCP server.
pub mod config;
/// Diagnostic engine operations.
pub mod engine;
/// Error types and result aliases for the application.
pub mod error;
/// MCP server implementation and request handling.
pub mod server;
/// Diagnosis session storage.
pub mod sessions;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, McpServer, SharedState};
