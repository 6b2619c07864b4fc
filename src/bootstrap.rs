use std::sync::Arc;

use axum::Router;
use tokio::{net::TcpListener, sync::watch};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    application::{materializer::Materializer, router::EventRouter},
    config::AppConfig,
    infrastructure::{
        kafka::BrokerConsumer,
        postgres::{build_pg_pool, repositories::PgUserStore},
    },
    interfaces::http::router::build_router,
    state::AppState,
};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Arc::new(AppConfig::load()?);

    // Both collaborators must be reachable before the process serves.
    let pg_pool = build_pg_pool(&config.postgres).await?;
    let consumer = BrokerConsumer::connect(&config.kafka)?;
    consumer.subscribe()?;

    let user_store = Arc::new(PgUserStore::new(pg_pool.clone()));
    let router = Arc::new(EventRouter::new(Materializer::new(user_store)));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer_task = tokio::spawn(consumer.run(router, shutdown_rx));
    let consumer_abort = consumer_task.abort_handle();

    let state = Arc::new(AppState::new(config.clone(), pg_pool.clone()));
    let app: Router = build_router(state);
    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // HTTP has drained; stop the poll loop, bounded by the grace period.
    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(config.kafka.shutdown_grace(), consumer_task).await {
        Ok(joined) => joined??,
        Err(_) => {
            error!("consumer did not stop within the grace period, aborting");
            consumer_abort.abort();
        }
    }

    pg_pool.close().await;
    info!("graceful shutdown completed");
    Ok(())
}

fn init_tracing() {
    if tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::builder()
                    .with_default_directive(Level::INFO.into())
                    .from_env_lossy()
            }))
            .finish(),
    )
    .is_ok()
    {
        return;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
