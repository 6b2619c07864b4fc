use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::config::PostgresConfig;

pub mod repositories;

/// Connects eagerly so an unreachable store fails the process at startup.
pub async fn build_pg_pool(cfg: &PostgresConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .connect(&cfg.uri)
        .await?;
    Ok(pool)
}
