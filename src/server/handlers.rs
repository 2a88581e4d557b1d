use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::SharedState;
use crate::engine::{
    actions, catalog, free_point, rca, risk, ActionParams, AnswerParams, FreePointParams,
    RcaParams, RiskParams, SessionParams, StartParams,
};
use crate::error::{McpError, McpResult};

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        // Mechanism classification
        "stuckpipe_diagnosis_start" => handle_diagnosis_start(state, arguments).await,
        "stuckpipe_diagnosis_answer" => handle_diagnosis_answer(state, arguments).await,
        "stuckpipe_diagnosis_state" => handle_diagnosis_state(state, arguments).await,
        // Stateless calculations
        "stuckpipe_free_point" => handle_free_point(arguments).await,
        "stuckpipe_risk_assess" => handle_risk_assess(arguments).await,
        "stuckpipe_risk_matrix" => handle_risk_matrix(),
        "stuckpipe_rca_report" => handle_rca_report(arguments).await,
        // Reference data
        "stuckpipe_actions" => handle_actions(arguments).await,
        "stuckpipe_mechanisms" => handle_mechanisms(),
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

/// Handle stuckpipe_diagnosis_start - begin or restart a diagnosis
async fn handle_diagnosis_start(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    // All fields optional; an absent argument object starts a fresh session.
    let arguments = arguments.or_else(|| Some(Value::Object(Default::default())));
    execute_handler(
        "stuckpipe_diagnosis_start",
        arguments,
        |params: StartParams| state.classifier.start(params),
    )
    .await
}

/// Handle stuckpipe_diagnosis_answer - answer the current question
async fn handle_diagnosis_answer(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    execute_handler(
        "stuckpipe_diagnosis_answer",
        arguments,
        |params: AnswerParams| state.classifier.answer(params),
    )
    .await
}

/// Handle stuckpipe_diagnosis_state - read a session's breadcrumb and position
async fn handle_diagnosis_state(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler(
        "stuckpipe_diagnosis_state",
        arguments,
        |params: SessionParams| state.classifier.session(params),
    )
    .await
}

/// Handle stuckpipe_free_point tool call
async fn handle_free_point(arguments: Option<Value>) -> McpResult<Value> {
    execute_handler(
        "stuckpipe_free_point",
        arguments,
        |params: FreePointParams| async move { free_point::calculate(&params) },
    )
    .await
}

/// Handle stuckpipe_risk_assess tool call
async fn handle_risk_assess(arguments: Option<Value>) -> McpResult<Value> {
    execute_handler(
        "stuckpipe_risk_assess",
        arguments,
        |params: RiskParams| async move { risk::assess(&params) },
    )
    .await
}

/// Handle stuckpipe_risk_matrix tool call
fn handle_risk_matrix() -> McpResult<Value> {
    let cells = serde_json::to_value(risk::risk_matrix())?;
    Ok(serde_json::json!({ "cells": cells }))
}

/// Handle stuckpipe_rca_report tool call
async fn handle_rca_report(arguments: Option<Value>) -> McpResult<Value> {
    execute_handler(
        "stuckpipe_rca_report",
        arguments,
        |params: RcaParams| async move { rca::generate(&params) },
    )
    .await
}

/// Handle stuckpipe_actions tool call
async fn handle_actions(arguments: Option<Value>) -> McpResult<Value> {
    execute_handler(
        "stuckpipe_actions",
        arguments,
        |params: ActionParams| async move { actions::lookup(&params) },
    )
    .await
}

/// Handle stuckpipe_mechanisms tool call
fn handle_mechanisms() -> McpResult<Value> {
    let mechanisms = serde_json::to_value(catalog())?;
    Ok(serde_json::json!({ "mechanisms": mechanisms }))
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}

/// Generic handler that executes an engine operation with consistent error handling.
///
/// Parses typed arguments, runs the operation, and serializes its result.
/// Engine errors keep their kind so the client can tell a stale answer from
/// bad input.
async fn execute_handler<P, R, E, F, Fut>(
    tool_name: &str,
    arguments: Option<Value>,
    operation: F,
) -> McpResult<Value>
where
    P: serde::de::DeserializeOwned,
    R: Serialize,
    E: Into<McpError>,
    F: FnOnce(P) -> Fut,
    Fut: std::future::Future<Output = Result<R, E>>,
{
    let params: P = parse_arguments(tool_name, arguments)?;

    let result = operation(params).await.map_err(Into::<McpError>::into)?;

    serde_json::to_value(result).map_err(McpError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestParams {
        content: String,
        value: i32,
    }

    #[test]
    fn test_parse_arguments_success() {
        let args = Some(json!({
            "content": "test content",
            "value": 42
        }));

        let params: TestParams = parse_arguments("test.tool", args).unwrap();
        assert_eq!(params.content, "test content");
        assert_eq!(params.value, 42);
    }

    #[test]
    fn test_parse_arguments_missing_arguments() {
        let result: McpResult<TestParams> = parse_arguments("test.tool", None);
        let err = result.unwrap_err();
        assert!(matches!(err, McpError::InvalidParameters { .. }));
        assert!(err.to_string().contains("Missing arguments"));
        assert!(err.to_string().contains("test.tool"));
    }

    #[test]
    fn test_parse_arguments_wrong_type() {
        let args = Some(json!({
            "content": "test",
            "value": "not a number"
        }));

        let result: McpResult<TestParams> = parse_arguments("stuckpipe_free_point", args);
        let err = result.unwrap_err();
        assert!(matches!(err, McpError::InvalidParameters { .. }));
        assert!(err.to_string().contains("stuckpipe_free_point"));
        assert_eq!(err.kind(), "invalid_input");
    }

    #[tokio::test]
    async fn test_execute_handler_keeps_engine_error_kind() {
        let result = handle_actions(Some(json!({"mechanism": "Bit Balling"}))).await;
        let err = result.unwrap_err();
        assert!(matches!(err, McpError::Engine(_)));
        assert_eq!(err.kind(), "unknown_mechanism");
    }

    #[tokio::test]
    async fn test_free_point_handler() {
        let value = handle_free_point(Some(json!({
            "pipe_od": 5.0,
            "pipe_id": 4.276,
            "pipe_grade": "S135",
            "stretch_inches": 6.0,
            "pull_force_lbs": 80000.0
        })))
        .await
        .unwrap();
        assert_eq!(value["pull_safe"], true);
        assert!(value["free_point_depth_ft"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_reference_handlers() {
        let matrix = handle_risk_matrix().unwrap();
        assert_eq!(matrix["cells"].as_array().unwrap().len(), 25);

        let mechanisms = handle_mechanisms().unwrap();
        assert_eq!(mechanisms["mechanisms"].as_array().unwrap().len(), 8);
    }
}
