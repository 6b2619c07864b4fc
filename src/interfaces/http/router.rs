use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

use super::handlers::health;

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
