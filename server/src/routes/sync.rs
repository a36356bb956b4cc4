//! Sync endpoint routes.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

use crate::auth::PushAuth;
use crate::error::{AppError, Result, INVALID_CHANGES};
use crate::handlers::{
    handle_checkpoint, handle_pull, handle_push, now_millis, CheckpointResponse, PullQuery,
    PullResponse, PushResponse,
};
use crate::AppState;

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync/checkpoint", get(checkpoint_handler))
        .route("/sync/pull", get(pull_handler))
        .route("/sync/push", post(push_handler))
}

/// GET /sync/checkpoint - Latest change log timestamp.
async fn checkpoint_handler(State(state): State<AppState>) -> Result<Json<CheckpointResponse>> {
    let response = handle_checkpoint(state.store.as_ref()).await?;
    Ok(Json(response))
}

/// GET /sync/pull - Changes since a timestamp.
async fn pull_handler(
    State(state): State<AppState>,
    params: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<PullResponse>> {
    let query = match params {
        Ok(Query(pairs)) => PullQuery::from_pairs(pairs),
        Err(rejection) => {
            tracing::warn!(
                reason = %rejection.body_text(),
                "sync_pull: unreadable query, using defaults"
            );
            PullQuery::default()
        }
    };
    let response = handle_pull(state.store.as_ref(), &state.recent, query, now_millis()).await?;
    Ok(Json(response))
}

/// POST /sync/push - Apply a batch of changes.
async fn push_handler(
    State(state): State<AppState>,
    auth: PushAuth,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<PushResponse>> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::warn!(reason = %rejection.body_text(), "sync_push rejected: unreadable body");
        AppError::BadRequest(INVALID_CHANGES.to_string())
    })?;

    let response = handle_push(
        &state.applier,
        state.store.as_ref(),
        &state.recent,
        body,
        auth.verified,
        now_millis(),
    )
    .await?;
    Ok(Json(response))
}
