use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::db::Database;
use crate::notifier::dedup::{DedupState, DedupStore};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub tracked_team: String,
}

#[derive(Serialize)]
struct StatusBody {
    tracked_team: String,
    last_signature: Option<String>,
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct PushTokenBody {
    push_token: Option<String>,
}

/// Build the Axum router for the status API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/status", get(status_handler))
        .route("/api/notifications", get(notifications_handler))
        .route("/api/subscribers/:user_id/push-token", put(push_token_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// GET /api/status
async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    DedupState::load(&state.db as &dyn DedupStore)
        .map(|s| {
            Json(StatusBody {
                tracked_team: state.tracked_team.clone(),
                last_signature: s.last_signature,
            })
        })
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// GET /api/notifications?limit=50
async fn notifications_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let limit = q.limit.unwrap_or(50).clamp(1, 500);
    state
        .db
        .list_recent_notifications(limit)
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// PUT /api/subscribers/:user_id/push-token
async fn push_token_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(body): Json<PushTokenBody>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let token = body.push_token.as_deref().map(str::trim).filter(|t| !t.is_empty());
    state
        .db
        .upsert_subscriber(user_id, token)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
