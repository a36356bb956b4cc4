//! scoresync server - HTTP sync service for offline-first assessment data.
//!
//! Clients push change batches to `/sync/push`, pull merged changes from
//! `/sync/pull` and poll `/sync/checkpoint`. Conflict decisions come from
//! `scoresync-engine`; this crate supplies the store, the HTTP surface and
//! the operational plumbing around them.

pub mod applier;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod recent;
pub mod routes;
pub mod store;

use crate::applier::ChangeApplier;
use crate::config::Config;
use crate::recent::RecentPushes;
use crate::store::{SyncStore, TimedStore};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Authoritative store, bounded by the configured timeout
    pub store: Arc<dyn SyncStore>,
    pub applier: Arc<ChangeApplier>,
    pub recent: Arc<RecentPushes>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wrap `store` with the configured timeout and build the shared state.
    pub fn new(store: Arc<dyn SyncStore>, config: Config) -> Self {
        let store: Arc<dyn SyncStore> = Arc::new(TimedStore::new(store, config.store_timeout));
        let applier = ChangeApplier::new(store.clone(), config.conflict_policy);

        Self {
            store,
            applier: Arc::new(applier),
            recent: Arc::new(RecentPushes::new()),
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
