//! MCP protocol implementation for JSON-RPC 2.0 communication.
//!
//! This module provides the core MCP server implementation including:
//! - JSON-RPC 2.0 request/response handling
//! - Tool definitions and schemas
//! - Stdio-based server communication

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use super::{handle_tool_call, SharedState};
use crate::error::McpError;

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod mcp_tests;

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request identifier (None for notifications).
    pub id: Option<Value>,
    /// The method name to invoke.
    pub method: String,
    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request identifier, null when the request had none.
    pub id: Value,
    /// The result on success (mutually exclusive with error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure (mutually exclusive with result).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Error code (negative for predefined errors).
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// MCP server information returned during initialization.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    /// The server name identifier.
    pub name: String,
    /// The server version string.
    pub version: String,
}

/// MCP server capabilities advertised to clients.
#[derive(Debug, Serialize)]
pub struct Capabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change dynamically.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Result of the MCP initialize handshake.
#[derive(Debug, Serialize)]
pub struct InitializeResult {
    /// The MCP protocol version supported.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Server capabilities.
    pub capabilities: Capabilities,
    /// Server identification information.
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// MCP tool definition with JSON Schema.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    /// Unique tool name (used in tool calls).
    pub name: String,
    /// Human-readable description of the tool.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Parameters for a tools/call request.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// The name of the tool to invoke.
    pub name: String,
    /// Optional arguments for the tool.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Content item within a tool result.
#[derive(Debug, Serialize)]
pub struct ToolResultContent {
    /// The content type (e.g., "text").
    #[serde(rename = "type")]
    pub content_type: String,
    /// The text content of the result.
    pub text: String,
}

/// Result of a tool invocation.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    /// The result content items.
    pub content: Vec<ToolResultContent>,
    /// Whether the result represents an error.
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// MCP Server running over stdio.
///
/// Handles JSON-RPC 2.0 messages over stdin/stdout for MCP protocol
/// communication with clients.
pub struct McpServer {
    /// Shared application state.
    state: SharedState,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Run the server using async stdio
    pub async fn run(&self) -> std::io::Result<()> {
        info!("Stuck-pipe MCP server reading stdin");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve newline-delimited JSON-RPC from `reader`, writing responses to `writer`.
    ///
    /// Returns when the reader reaches EOF.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                info!("EOF received, shutting down");
                break;
            }

            // Notifications produce no output.
            if let Some(response) = self.handle_message(&line).await {
                let response_json = serde_json::to_string(&response)?;
                debug!(response = %response_json, "Sending response");

                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle one raw protocol line.
    ///
    /// Blank lines and notifications yield `None`; malformed JSON yields a
    /// `-32700` parse error.
    pub async fn handle_message(&self, line: &str) -> Option<JsonRpcResponse> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        debug!(request = %trimmed, "Received request");

        match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                error!(error = %e, "Failed to parse request");
                Some(JsonRpcResponse::error(
                    None,
                    -32700,
                    format!("Parse error: {}", e),
                ))
            }
        }
    }

    /// Handle a single JSON-RPC request.
    ///
    /// Returns `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        // Check if this is a notification (no id = no response required)
        let is_notification = request.id.is_none();

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(request.id)),
            "initialized" | "notifications/initialized" | "notifications/cancelled" => {
                debug!(method = %request.method, "Received notification");
                None
            }
            "tools/list" => Some(self.handle_tools_list(request.id)),
            "tools/call" => Some(self.handle_tool_call(request.id, request.params).await),
            "ping" => Some(JsonRpcResponse::success(
                request.id,
                Value::Object(Default::default()),
            )),
            method => {
                // For unknown methods, only respond if it's a request (has id)
                if is_notification {
                    debug!(method = %method, "Unknown notification, ignoring");
                    None
                } else {
                    error!(method = %method, "Unknown method");
                    Some(JsonRpcResponse::error(
                        request.id,
                        -32601,
                        format!("Method not found: {}", method),
                    ))
                }
            }
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling initialize request");

        let result = InitializeResult {
            protocol_version: "2024-11-05".to_string(),
            capabilities: Capabilities {
                tools: ToolCapabilities {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: "stuckpipe-engine".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize initialize result");
                JsonRpcResponse::error(id, -32603, format!("Internal error: {}", e))
            }
        }
    }

    /// Handle tools/list request
    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling tools/list request");

        let tools = tool_definitions();

        JsonRpcResponse::success(
            id,
            serde_json::json!({
                "tools": tools
            }),
        )
    }

    /// Handle tools/call request
    async fn handle_tool_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, format!("Invalid params: {}", e));
                }
            },
            None => {
                return JsonRpcResponse::error(id, -32602, "Missing params");
            }
        };

        info!(tool = %params.name, "Handling tool call");

        let (content, is_error) =
            match handle_tool_call(&self.state, &params.name, params.arguments).await {
                Ok(result) => {
                    let text = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
                        error!(error = %e, "Failed to serialize tool result");
                        format!("{{\"error\": \"Serialization failed: {}\"}}", e)
                    });
                    (
                        ToolResultContent {
                            content_type: "text".to_string(),
                            text,
                        },
                        None,
                    )
                }
                Err(e) => {
                    warn!(tool = %params.name, kind = e.kind(), error = %e, "Tool call failed");
                    (
                        ToolResultContent {
                            content_type: "text".to_string(),
                            text: tool_error_text(&e),
                        },
                        Some(true),
                    )
                }
            };

        let tool_result = ToolCallResult {
            content: vec![content],
            is_error,
        };

        match serde_json::to_value(tool_result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize tool call result");
                JsonRpcResponse::error(id.clone(), -32603, format!("Internal error: {}", e))
            }
        }
    }
}

/// Every tool advertised by `tools/list`.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        // Mechanism classification
        get_diagnosis_start_tool(),
        get_diagnosis_answer_tool(),
        get_diagnosis_state_tool(),
        // Calculations
        get_free_point_tool(),
        get_risk_assess_tool(),
        get_risk_matrix_tool(),
        get_rca_report_tool(),
        // Reference data
        get_actions_tool(),
        get_mechanisms_tool(),
    ]
}

/// Render a failed tool call as the `{"error", "kind"}` text payload.
pub fn tool_error_text(err: &McpError) -> String {
    serde_json::json!({
        "error": err.to_string(),
        "kind": err.kind(),
    })
    .to_string()
}

fn mechanism_names() -> Vec<&'static str> {
    crate::engine::Mechanism::ALL
        .iter()
        .map(|m| m.as_str())
        .collect()
}

/// Get the diagnosis start tool definition
fn get_diagnosis_start_tool() -> Tool {
    Tool {
        name: "stuckpipe_diagnosis_start".to_string(),
        description: "Start an interactive stuck-pipe mechanism diagnosis. Returns a session ID and the first yes/no question. Pass an existing session_id to restart that session from the first question.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Optional existing session to restart"
                }
            },
            "additionalProperties": false
        }),
    }
}

/// Get the diagnosis answer tool definition
fn get_diagnosis_answer_tool() -> Tool {
    Tool {
        name: "stuckpipe_diagnosis_answer".to_string(),
        description: "Answer the current diagnostic question. Returns either the next question or the classified sticking mechanism with its description and indicators. node_id must match the session's current question; stale answers are rejected.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Session returned by stuckpipe_diagnosis_start"
                },
                "node_id": {
                    "type": "string",
                    "description": "ID of the question being answered"
                },
                "answer": {
                    "type": "string",
                    "enum": ["yes", "no"],
                    "description": "Answer to the question"
                }
            },
            "required": ["session_id", "node_id", "answer"],
            "additionalProperties": false
        }),
    }
}

/// Get the diagnosis state tool definition
fn get_diagnosis_state_tool() -> Tool {
    Tool {
        name: "stuckpipe_diagnosis_state".to_string(),
        description: "Read a diagnosis session: the questions answered so far, the current question, and the result once classified.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Session to read"
                }
            },
            "required": ["session_id"],
            "additionalProperties": false
        }),
    }
}

/// Get the free-point tool definition
fn get_free_point_tool() -> Tool {
    Tool {
        name: "stuckpipe_free_point".to_string(),
        description: "Estimate free-point depth from measured stretch under a known pull (stretch method), and check the pull against the pipe-body yield of the given grade.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "pipe_od": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "description": "Pipe outer diameter (in)"
                },
                "pipe_id": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "description": "Pipe inner diameter (in), less than pipe_od"
                },
                "pipe_grade": {
                    "type": "string",
                    "enum": ["E75", "X95", "G105", "S135", "V150"],
                    "description": "API drill pipe grade"
                },
                "stretch_inches": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "description": "Measured stretch at surface (in)"
                },
                "pull_force_lbs": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "description": "Applied pull above string weight (lbf)"
                }
            },
            "required": ["pipe_od", "pipe_id", "pipe_grade", "stretch_inches", "pull_force_lbs"],
            "additionalProperties": false
        }),
    }
}

/// Get the risk assessment tool definition
fn get_risk_assess_tool() -> Tool {
    Tool {
        name: "stuckpipe_risk_assess".to_string(),
        description: "Score probability (1-5) and severity (1-5) of a sticking mechanism from live operating parameters. Returns the risk score, level, heat-map band, and weighted contributing factors.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "mechanism": {
                    "type": "string",
                    "enum": mechanism_names(),
                    "description": "Sticking mechanism to assess"
                },
                "params": {
                    "type": "object",
                    "properties": {
                        "mud_weight": { "type": "number", "exclusiveMinimum": 0, "description": "Mud weight (ppg)" },
                        "pore_pressure": { "type": "number", "exclusiveMinimum": 0, "description": "Pore pressure (ppg equivalent)" },
                        "inclination": { "type": "number", "minimum": 0, "maximum": 180, "description": "Inclination (degrees)" },
                        "stationary_hours": { "type": "number", "minimum": 0, "description": "Time stationary (hours)" },
                        "torque": { "type": "number", "minimum": 0, "description": "Surface torque (ft-lb)" },
                        "overpull": { "type": "number", "minimum": 0, "description": "Overpull above string weight (klb)" }
                    },
                    "required": ["mud_weight", "pore_pressure", "inclination", "stationary_hours", "torque", "overpull"]
                }
            },
            "required": ["mechanism", "params"],
            "additionalProperties": false
        }),
    }
}

/// Get the risk matrix tool definition
fn get_risk_matrix_tool() -> Tool {
    Tool {
        name: "stuckpipe_risk_matrix".to_string(),
        description: "The 5x5 probability x severity risk matrix with the level and heat-map band of every cell.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
    }
}

/// Get the RCA report tool definition
fn get_rca_report_tool() -> Tool {
    Tool {
        name: "stuckpipe_rca_report".to_string(),
        description: "Audit a 5-Whys chain or fishbone (6M) diagram and generate a root-cause report with corrective and prevention actions. 5-Whys needs at least 3 non-empty entries; fishbone needs at least one factor.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "methodology": {
                    "type": "string",
                    "enum": ["5whys", "fishbone"],
                    "description": "Investigation methodology"
                },
                "data": {
                    "oneOf": [
                        {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "5-Whys: ordered chain, the last entry being the deepest cause"
                        },
                        {
                            "type": "object",
                            "additionalProperties": {
                                "type": "array",
                                "items": { "type": "string" }
                            },
                            "description": "Fishbone: category (Man, Machine, Method, Material, Measurement, Environment) to factors"
                        }
                    ]
                },
                "mechanism": {
                    "type": "string",
                    "enum": mechanism_names(),
                    "description": "Optional mechanism the event was classified as"
                }
            },
            "required": ["methodology", "data"],
            "additionalProperties": false
        }),
    }
}

/// Get the recommended actions tool definition
fn get_actions_tool() -> Tool {
    Tool {
        name: "stuckpipe_actions".to_string(),
        description: "Recommended immediate, short-term, and contingency actions for a sticking mechanism.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "mechanism": {
                    "type": "string",
                    "enum": mechanism_names(),
                    "description": "Sticking mechanism"
                }
            },
            "required": ["mechanism"],
            "additionalProperties": false
        }),
    }
}

/// Get the mechanism catalog tool definition
fn get_mechanisms_tool() -> Tool {
    Tool {
        name: "stuckpipe_mechanisms".to_string(),
        description: "List the eight sticking mechanisms with their descriptions and expected indicators.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
    }
}
