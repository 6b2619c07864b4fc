use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;

/// Shared state for the HTTP surface. The pool is the same one the
/// consumer pipeline writes through.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pg_pool: PgPool,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, pg_pool: PgPool) -> Self {
        Self { config, pg_pool }
    }
}

pub type SharedState = Arc<AppState>;
