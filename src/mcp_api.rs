use std::{future::Future, time::Instant};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{Response, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    errors::ToolError,
    tools::{run_tool, tool_definitions, Tool},
    AppState,
};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "nyko";
pub const SERVER_VERSION: &str = "1.0.0";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    jsonrpc: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcSuccess {
    jsonrpc: &'static str,
    id: Value,
    result: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcFailure {
    jsonrpc: &'static str,
    id: Value,
    error: JsonRpcError,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum JsonRpcResponse {
    Success(JsonRpcSuccess),
    Failure(JsonRpcFailure),
}

impl JsonRpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self::Success(JsonRpcSuccess {
            jsonrpc: "2.0",
            id,
            result,
        })
    }

    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self::Failure(JsonRpcFailure {
            jsonrpc: "2.0",
            id,
            error: JsonRpcError {
                code,
                message: message.into(),
                data: None,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct ToolContent {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

#[derive(Debug, Serialize)]
struct ToolCallResult {
    content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    is_error: bool,
}

impl ToolCallResult {
    fn text(text: String, is_error: bool) -> Self {
        Self {
            content: vec![ToolContent { kind: "text", text }],
            is_error,
        }
    }
}

struct ToolContext {
    trace_id: String,
    start: Instant,
}

pub async fn mcp(State(state): State<AppState>, body: Bytes) -> Response<Body> {
    if body.is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &JsonRpcResponse::error(json!(0), INVALID_REQUEST, "Empty request body"),
        );
    }

    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(err) => {
            debug!(error = %err, "rejecting unparsable MCP body");
            return json_response(
                StatusCode::BAD_REQUEST,
                &JsonRpcResponse::error(json!(0), PARSE_ERROR, "Invalid JSON"),
            );
        }
    };

    let fallback_id = raw
        .get("id")
        .filter(|id| !id.is_null())
        .cloned()
        .unwrap_or_else(|| json!(0));

    let request = match serde_json::from_value::<JsonRpcRequest>(raw) {
        Ok(request)
            if request.jsonrpc.as_deref() == Some("2.0")
                && request.method.as_deref().is_some_and(|m| !m.is_empty()) =>
        {
            request
        }
        _ => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &JsonRpcResponse::error(fallback_id, INVALID_REQUEST, "Invalid JSON-RPC request"),
            );
        }
    };

    let id = request.id.clone().unwrap_or(Value::Null);
    let method = request.method.clone().unwrap_or_default();
    let response = guarded(id, &method, async move { dispatch(&state, request).await }).await;

    json_response(StatusCode::OK, &response)
}

/// Run `work` on its own task so a panic becomes an internal-error
/// response instead of a dropped connection.
async fn guarded<F>(id: Value, method: &str, work: F) -> JsonRpcResponse
where
    F: Future<Output = JsonRpcResponse> + Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(response) => response,
        Err(err) => {
            let message = panic_message(err);
            error!(method = %method, error = %message, "MCP dispatch failed");
            JsonRpcResponse::error(id, INTERNAL_ERROR, message)
        }
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return "Internal error".to_string();
    }
    let payload = err.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Internal error".to_string())
}

pub async fn dispatch(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.unwrap_or(Value::Null);
    let method = request.method.unwrap_or_default();

    let response = match method.as_str() {
        "initialize" => JsonRpcResponse::ok(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION,
                },
            }),
        ),
        "initialized" | "notifications/initialized" | "ping" => JsonRpcResponse::ok(id, json!({})),
        "tools/list" => JsonRpcResponse::ok(
            id,
            json!({ "tools": tool_definitions(state.config.enable_setup_tool) }),
        ),
        "tools/call" => call_tool(state, id, request.params).await,
        other => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
    };

    if state.config.mcp_dev_log_payloads {
        debug!(method = %method, "MCP request handled");
    }

    response
}

async fn call_tool(state: &AppState, id: Value, params: Option<Value>) -> JsonRpcResponse {
    let Some(params) = params.and_then(|value| serde_json::from_value::<ToolCallParams>(value).ok())
    else {
        return JsonRpcResponse::error(id, INVALID_PARAMS, "Invalid tool call parameters");
    };

    let ctx = ToolContext {
        trace_id: Uuid::new_v4().to_string(),
        start: Instant::now(),
    };
    let span = info_span!("tools_call", trace_id = %ctx.trace_id, tool = %params.name);

    async move {
        let arguments = if params.arguments.is_null() {
            json!({})
        } else {
            params.arguments
        };

        let outcome = match Tool::resolve(&params.name, state.config.enable_setup_tool) {
            Some(tool) => run_tool(state, tool, &arguments).await,
            None => Err(ToolError::UnknownTool(params.name.clone())),
        };
        let elapsed_ms = ctx.start.elapsed().as_millis() as u64;
        render_outcome(state, id, outcome, elapsed_ms)
    }
    .instrument(span)
    .await
}

/// Tool failures become `isError` content; internal failures become a
/// top-level -32603 error.
fn render_outcome(
    state: &AppState,
    id: Value,
    outcome: Result<Value, ToolError>,
    elapsed_ms: u64,
) -> JsonRpcResponse {
    let result = match outcome {
        Ok(payload) => match serde_json::to_string_pretty(&payload) {
            Ok(text) => {
                info!(elapsed_ms, "tool call succeeded");
                if state.config.mcp_dev_log_payloads {
                    debug!(response_bytes = text.len(), "MCP tool response payload");
                }
                ToolCallResult::text(text, false)
            }
            Err(err) => return JsonRpcResponse::error(id, INTERNAL_ERROR, err.to_string()),
        },
        Err(err) if err.is_internal() => {
            error!(elapsed_ms, error = %err, "tool call failed internally");
            return JsonRpcResponse::error(id, INTERNAL_ERROR, err.to_string());
        }
        Err(err) => {
            warn!(elapsed_ms, code = err.code(), error = %err, "tool call failed");
            let text = json!({ "error": err.to_string(), "code": err.code() }).to_string();
            ToolCallResult::text(text, true)
        }
    };

    match serde_json::to_value(&result) {
        Ok(result) => JsonRpcResponse::ok(id, result),
        Err(err) => JsonRpcResponse::error(id, INTERNAL_ERROR, err.to_string()),
    }
}

fn json_response(status: StatusCode, payload: &JsonRpcResponse) -> Response<Body> {
    let body = serde_json::to_vec(payload).unwrap_or_else(|_| b"{}".to_vec());
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap_or_else(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": 0,
                    "error": { "code": INTERNAL_ERROR, "message": "Failed building MCP response" }
                })),
            )
                .into_response()
        })
}
