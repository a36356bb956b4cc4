//! HTTP routes: health plus the three sync endpoints.

mod health;
mod sync;

use crate::AppState;
use axum::Router;

pub use health::HealthResponse;

pub fn create_routes() -> Router<AppState> {
    health::routes().merge(sync::routes())
}
