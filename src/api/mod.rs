pub mod chat;
pub mod health;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;
use crate::util::normalize_base_path;

/// Build the gateway router, nested under the configured `base_path`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let base_path = normalize_base_path(&state.config.server.base_path);
    let routes = Router::new()
        .route("/", get(health::health_handler))
        .route("/v1/chat/completions", post(chat::handler))
        .with_state(state);

    if base_path.is_empty() {
        routes
    } else {
        Router::new().nest(&base_path, routes)
    }
}
