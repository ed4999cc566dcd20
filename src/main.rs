use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use wayfarer_api::{
    api::{create_router, AppState},
    config::Config,
    db::{create_redis_client, MemoryStore, PersistentStore, RedisStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("wayfarer_api=info,tower_http=info"))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let store: Arc<dyn PersistentStore> = match &config.redis_url {
        Some(url) => {
            tracing::info!("Session snapshots stored in Redis");
            Arc::new(RedisStore::new(create_redis_client(url)?))
        }
        None => {
            tracing::info!("REDIS_URL not set, session snapshots kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::from_config(&config, store);

    // Load the places capability in the background so the first search is not delayed
    let places = state.places.clone();
    tokio::spawn(async move {
        match places.ensure_ready().await {
            Ok(()) => {
                if let Err(e) = places.probe_api_key().await {
                    tracing::warn!(error = %e, "API key probe failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Places capability unavailable at startup"),
        }
    });

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
