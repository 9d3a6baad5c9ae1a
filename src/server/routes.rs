//! HTTP routes
//!
//! JSON API for hosts that run the access check out of process.

use crate::content::{ChangedItem, ContentEvent, NodeId, PathAncestry};
use crate::error::{CompileError, ContentError, GuardError};
use crate::rules::{AccessDecision, Rule};
use crate::server::AppState;
use crate::service::GuardOutcome;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/check", post(check))
        .route("/evaluate", post(evaluate))
        .route("/reload", post(reload))
        .route("/events/published", post(published))
        .route("/events/trashed", post(trashed))
        .route("/coverage/{id}", get(coverage))
        .route("/rules", get(rules))
        .route("/stats", get(stats))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Error body with a status code
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.kind,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

impl From<GuardError> for ApiError {
    fn from(err: GuardError) -> Self {
        let (status, kind) = match &err {
            GuardError::NodeNotFound(_) => (StatusCode::NOT_FOUND, "node_not_found"),
            GuardError::DanglingReference { .. } => (StatusCode::CONFLICT, "dangling_reference"),
            GuardError::Content(_) => (StatusCode::BAD_GATEWAY, "content_unavailable"),
        };
        ApiError::new(status, kind, err.to_string())
    }
}

impl From<CompileError> for ApiError {
    fn from(err: CompileError) -> Self {
        match &err {
            CompileError::ConfigurationMissing { .. } => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "configuration_missing",
                err.to_string(),
            ),
            CompileError::Content(_) => {
                ApiError::new(StatusCode::BAD_GATEWAY, "content_unavailable", err.to_string())
            }
        }
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        ApiError::new(StatusCode::BAD_GATEWAY, "content_unavailable", err.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub node_id: NodeId,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub path: PathAncestry,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventRequest {
    #[serde(default)]
    pub items: Vec<ChangedItem>,
}

#[derive(Debug, Serialize)]
struct EventResponse {
    reload_triggered: bool,
}

#[derive(Debug, Serialize)]
struct RulesResponse<'a> {
    initialized: bool,
    generation: u64,
    folder_id: NodeId,
    visualize_coverage: bool,
    compiled_at: DateTime<Utc>,
    rules: &'a [Rule],
    skipped: Vec<SkippedRule>,
}

#[derive(Debug, Serialize)]
struct SkippedRule {
    rule_node: NodeId,
    reason: String,
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "rules_loaded": state.service.store().is_initialized(),
    }))
}

async fn check(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> Result<Json<GuardOutcome>, ApiError> {
    let groups: HashSet<String> = request.groups.into_iter().collect();
    let outcome = state.guard.check_node(request.node_id, &groups).await?;
    Ok(Json(outcome))
}

async fn evaluate(
    State(state): State<AppState>,
    Json(request): Json<EvaluateRequest>,
) -> Json<AccessDecision> {
    let groups: HashSet<String> = request.groups.into_iter().collect();
    Json(state.guard.evaluator().check(&request.path, &groups))
}

async fn reload(State(state): State<AppState>) -> Result<Response, ApiError> {
    let outcome = state.service.reload().await?;
    Ok(Json(outcome).into_response())
}

async fn published(
    State(state): State<AppState>,
    Json(request): Json<EventRequest>,
) -> Json<EventResponse> {
    let event = ContentEvent::Published(request.items);
    Json(EventResponse {
        reload_triggered: state.reloader.notify(&event),
    })
}

async fn trashed(
    State(state): State<AppState>,
    Json(request): Json<EventRequest>,
) -> Json<EventResponse> {
    let event = ContentEvent::Trashed(request.items);
    Json(EventResponse {
        reload_triggered: state.reloader.notify(&event),
    })
}

async fn coverage(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let node_id = NodeId(id);
    match state.service.coverage(node_id).await? {
        Some(coverage) => Ok(Json(coverage).into_response()),
        None => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "node_not_found",
            format!("Node {} does not exist", node_id),
        )),
    }
}

async fn rules(State(state): State<AppState>) -> Response {
    let Some(snapshot) = state.service.store().current() else {
        return Json(json!({ "initialized": false })).into_response();
    };

    let body = RulesResponse {
        initialized: true,
        generation: snapshot.generation(),
        folder_id: snapshot.folder_id(),
        visualize_coverage: snapshot.visualize_coverage(),
        compiled_at: snapshot.compiled_at(),
        rules: snapshot.rules(),
        skipped: snapshot
            .skipped()
            .iter()
            .map(|e| SkippedRule {
                rule_node: e.rule_node,
                reason: e.reason.to_string(),
            })
            .collect(),
    };
    Json(body).into_response()
}

async fn stats(State(state): State<AppState>) -> Json<crate::stats::StatsSnapshot> {
    Json(state.stats.snapshot())
}
