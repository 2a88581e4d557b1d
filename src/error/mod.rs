use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Decision tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),
}

/// Failures of the diagnostic engine operations.
///
/// Every variant is recoverable by the caller. No engine operation mutates
/// session state before returning one of these.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid node: expected {}, got {received}", .expected.as_deref().unwrap_or("none (diagnosis complete)"))]
    InvalidNode {
        expected: Option<String>,
        received: String,
    },

    #[error("Unknown mechanism: {mechanism}")]
    UnknownMechanism { mechanism: String },

    #[error("Incomplete investigation: {reason}")]
    IncompleteInvestigation { reason: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Shorthand for an [`EngineError::InvalidInput`].
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable error kind reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidInput { .. } => "invalid_input",
            EngineError::InvalidNode { .. } => "invalid_node",
            EngineError::UnknownMechanism { .. } => "unknown_mechanism",
            EngineError::IncompleteInvestigation { .. } => "incomplete_investigation",
            EngineError::SessionNotFound { .. } => "session_not_found",
            EngineError::Store(_) => "internal",
        }
    }
}

/// Session store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session not found: {session_id}")]
    NotFound { session_id: String },

    #[error("Revision conflict on session {session_id}: expected {expected}, found {actual}")]
    Conflict {
        session_id: String,
        expected: u64,
        actual: u64,
    },
}

/// Decision tree validation errors, raised once at load time.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Root node '{root}' is not defined")]
    MissingRoot { root: String },

    #[error("Node '{from}' has a {answer} edge to undefined node '{to}'")]
    DanglingEdge {
        from: String,
        answer: String,
        to: String,
    },

    #[error("Cycle detected through node '{node_id}'")]
    Cycle { node_id: String },

    #[error("Node '{node_id}' is unreachable from the root")]
    Unreachable { node_id: String },

    #[error("Tree depth {depth} exceeds the maximum of {max}")]
    TooDeep { depth: usize, max: usize },

    #[error("Node '{node_id}' is defined more than once")]
    DuplicateNode { node_id: String },

    #[error("Node '{node_id}' has an empty question")]
    EmptyQuestion { node_id: String },

    #[error("Failed to read tree file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse tree definition: {0}")]
    Parse(#[from] serde_json::Error),
}

/// MCP protocol errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParameters { tool_name: String, message: String },

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Error kind reported in the `kind` field of a failed tool result.
    pub fn kind(&self) -> &'static str {
        match self {
            McpError::Engine(e) => e.kind(),
            McpError::InvalidParameters { .. } => "invalid_input",
            McpError::UnknownTool { .. } => "unknown_tool",
            McpError::Json(_) => "internal",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Engine(EngineError::Store(err))
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for session store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;
