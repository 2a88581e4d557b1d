//! Command-line interface.
//!
//! `serve` (the default) runs the MCP server on stdio. The other commands
//! run one engine operation and print the result.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::engine::{actions, free_point, ActionParams, DecisionTree, FreePointParams};

/// Stuck-pipe diagnostic engine.
#[derive(Parser, Debug)]
#[command(name = "stuckpipe-engine", version, about)]
pub struct Cli {
    /// Command to run (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the MCP server on stdio
    Serve,

    /// Validate a decision tree file and print its summary
    CheckTree {
        /// Tree file; the configured tree (or the built-in one) when omitted
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Print the recommended actions for a sticking mechanism
    Actions {
        /// Mechanism name, e.g. "Differential Sticking" or differential_sticking
        mechanism: String,
    },

    /// Calculate free-point depth by the stretch method
    FreePoint {
        /// Pipe outer diameter (in)
        #[arg(long)]
        od: f64,
        /// Pipe inner diameter (in)
        #[arg(long)]
        id: f64,
        /// Pipe grade (E75, X95, G105, S135, V150)
        #[arg(long)]
        grade: String,
        /// Measured stretch (in)
        #[arg(long)]
        stretch: f64,
        /// Applied pull (lbf)
        #[arg(long)]
        pull: f64,
    },
}

/// Result of CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Execute a one-shot command. `Serve` is handled by the binary.
pub fn execute_command(command: Commands, config: &Config) -> CliResult {
    match command {
        Commands::Serve => CliResult::error("serve runs the server and has no one-shot output"),
        Commands::CheckTree { path } => execute_check_tree(path, config),
        Commands::Actions { mechanism } => execute_actions(mechanism),
        Commands::FreePoint {
            od,
            id,
            grade,
            stretch,
            pull,
        } => execute_free_point(FreePointParams {
            pipe_od: od,
            pipe_id: id,
            pipe_grade: grade,
            stretch_inches: stretch,
            pull_force_lbs: pull,
        }),
    }
}

fn execute_check_tree(path: Option<PathBuf>, config: &Config) -> CliResult {
    let (source, loaded) = match path {
        Some(path) => (path.display().to_string(), DecisionTree::load(&path).map_err(|e| e.to_string())),
        None => (
            config
                .tree
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in".to_string()),
            config.load_tree().map_err(|e| e.to_string()),
        ),
    };

    let tree = match loaded {
        Ok(tree) => tree,
        Err(e) => return CliResult::error(format!("Tree {} is invalid: {}", source, e)),
    };

    let mechanisms: Vec<&str> = tree
        .reachable_mechanisms()
        .iter()
        .map(|m| m.as_str())
        .collect();

    let mut output = String::new();
    output.push_str(&format!("Decision tree: {}\n", source));
    output.push_str(&format!("  root:       {}\n", tree.root_id()));
    output.push_str(&format!("  questions:  {}\n", tree.node_count()));
    output.push_str(&format!("  depth:      {}\n", tree.depth()));
    output.push_str(&format!(
        "  mechanisms: {} ({})\n",
        mechanisms.len(),
        mechanisms.join(", ")
    ));
    CliResult::success(output)
}

fn execute_actions(mechanism: String) -> CliResult {
    let plan = match actions::lookup(&ActionParams { mechanism }) {
        Ok(plan) => plan,
        Err(e) => return CliResult::error(e.to_string()),
    };

    let mut output = format!("{}\n", plan.mechanism);
    for (heading, items) in [
        ("Immediate", &plan.immediate),
        ("Short term", &plan.short_term),
        ("Contingency", &plan.contingency),
    ] {
        output.push_str(&format!("\n{}:\n", heading));
        for (i, item) in items.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, item));
        }
    }
    CliResult::success(output)
}

fn execute_free_point(params: FreePointParams) -> CliResult {
    match free_point::calculate(&params) {
        Ok(result) => CliResult::success(format!(
            "Free point depth:   {:.0} ft\nPipe body area:     {:.4} in^2\nPull (% of yield):  {:.1}%{}\n",
            result.free_point_depth_ft,
            result.pipe_area_sqin,
            result.pull_pct_of_yield,
            if result.pull_safe {
                ""
            } else {
                "  WARNING: exceeds safe pull limit"
            }
        )),
        Err(e) => CliResult::error(e.to_string()),
    }
}
