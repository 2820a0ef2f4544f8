//! Axum router wiring.
//!
//! One versioned route under the configured prefix serves both HTTP calls and
//! WebSocket upgrades. Everything else falls through to axum's 404.

use axum::{routing::any, Router};

use crate::{app_state::AppState, transport};

pub fn build_router(state: AppState) -> Router {
    let prefix = state.cfg().server.api_prefix.trim_end_matches('/');
    let path = format!("{prefix}/:version");
    Router::new()
        .route(&path, any(transport::entry))
        .with_state(state)
}
