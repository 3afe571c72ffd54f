//! REST API server for the research agent
//!
//! Thin session boundary over the agent loop: accepts a query plus
//! optional budget overrides, returns one outcome per request.

use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::agent::AgentLoop;
use crate::config::AgentConfig;
use crate::models::{AgentOutcome, ErrorKind, Query};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QueryRequest {
    pub query: String,
    pub ticker: Option<String>,
    pub date_range: Option<String>,
    pub max_steps: Option<u32>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<AgentLoop>,
    pub config: AgentConfig,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::UpstreamFailure | ErrorKind::ToolUnavailable | ErrorKind::ParseFailure => {
            StatusCode::BAD_GATEWAY
        }
        ErrorKind::BudgetExceeded => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Query Endpoint
/// =============================

async fn run_query(
    State(state): State<ApiState>,
    Json(req): Json<QueryRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Query must be a non-empty string".into())),
        );
    }

    info!("Received query: {}", req.query);

    let query = Query {
        text: req.query,
        ticker: req.ticker,
        date_range: req.date_range,
    };

    let mut config = state.config.clone();
    if let Some(max_steps) = req.max_steps {
        config.max_steps = max_steps.clamp(1, state.config.max_steps);
    }

    let report = state.agent.run_detailed(query, &config).await;

    match report.outcome {
        AgentOutcome::Answer { text } => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "answer": text,
                "reasoning_steps": report.reasoning_steps,
                "elapsed_ms": report.elapsed_ms,
                "transcript": report.transcript.turns(),
            }))),
        ),
        AgentOutcome::Failure { kind, message } => (
            status_for(kind),
            Json(ApiResponse::error(format!("{}: {}", kind, message))),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(agent: Arc<AgentLoop>, config: AgentConfig) -> Router {
    let state = ApiState { agent, config };

    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(run_query))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    agent: Arc<AgentLoop>,
    config: AgentConfig,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(agent, config);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(ErrorKind::BudgetExceeded), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::UpstreamFailure), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_api_response_shapes() {
        let ok = ApiResponse::success(serde_json::json!({"answer": "42"}));
        assert!(ok.success);
        assert!(ok.error.is_none());

        let err = ApiResponse::error("upstream_failure: reasoner failed".into());
        assert!(!err.success);
        assert!(err.data.is_none());
    }
}
