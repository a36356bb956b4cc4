//! Liveness and banner endpoints.

use axum::{extract::State, routing::get, Json, Router};
use scoresync_engine::ConflictPolicy;
use serde::Serialize;

use crate::AppState;

/// Body of `GET /health`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// `postgres` or `memory`
    pub store: &'static str,
    pub conflict_policy: ConflictPolicy,
    /// Whether pushes must carry the shared token
    pub push_auth: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/", get(|| async { "scoresync sync server" }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = &state.config;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        store: if config.database_url.is_some() {
            "postgres"
        } else {
            "memory"
        },
        conflict_policy: config.conflict_policy,
        push_auth: config.push_token.is_some(),
    })
}
