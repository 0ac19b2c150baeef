use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

use crate::mcp_api::{SERVER_VERSION, PROTOCOL_VERSION};

pub async fn healthz() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": SERVER_VERSION,
        "timestamp": Utc::now(),
    }))
}

pub async fn info() -> impl IntoResponse {
    Json(json!({
        "name": "Nyko MCP Server",
        "version": SERVER_VERSION,
        "protocolVersion": PROTOCOL_VERSION,
        "description": "Battle-tested patterns for AI coding assistants",
        "endpoints": {
            "mcp": "/mcp (POST)",
            "health": "/health (GET)",
            "sse": "/sse (GET)",
        },
        "usage": {
            "claude_code": {
                "config": "~/.claude/settings.json",
                "example": {
                    "mcpServers": {
                        "nyko": { "url": "https://nyko-mcp.nyko-ai.workers.dev/mcp" }
                    }
                }
            }
        }
    }))
}

pub async fn sse() -> impl IntoResponse {
    (StatusCode::NOT_IMPLEMENTED, "SSE not yet implemented")
}

/// CORS headers are added by the router layer.
pub async fn preflight() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}
