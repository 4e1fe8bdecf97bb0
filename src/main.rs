use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use loopync::config::Config;
use loopync::infrastructure::media_provider::HmacCredentialSigner;
use loopync::interface::api::{build_router, init_metrics, AppState, Repositories};

#[cfg(feature = "postgres")]
use loopync::infrastructure::persistence::{
    create_pool, run_migrations, DatabaseConfig, PgFriendshipRepository, PgThreadRepository,
    PgUserRepository,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    // Initialize tracing; RUST_LOG overrides the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Loopync {}", env!("CARGO_PKG_VERSION"));

    let repos = repositories(&config).await?;

    let signer = HmacCredentialSigner::new(&config.media.app_id, &config.media.app_certificate);
    if !signer.is_configured() {
        warn!("Media provider credentials missing; call endpoints will answer 503");
    }

    info!("Initializing Prometheus metrics exporter");
    let prometheus_handle = init_metrics()?;

    let state = AppState::new(repos, Arc::new(signer), &config);
    let app = build_router(state, prometheus_handle);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("REST API server listening on {}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Loopync stopped");
    Ok(())
}

#[cfg(feature = "postgres")]
async fn repositories(config: &Config) -> anyhow::Result<Repositories> {
    if !config.uses_database() {
        info!("No database URL configured, using in-memory storage");
        return Ok(Repositories::memory());
    }

    let db_config = DatabaseConfig::new(&config.database.url, config.database.max_connections);
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    Ok(Repositories {
        users: Arc::new(PgUserRepository::new(pool.clone())),
        friendships: Arc::new(PgFriendshipRepository::new(pool.clone())),
        threads: Arc::new(PgThreadRepository::new(pool)),
    })
}

#[cfg(not(feature = "postgres"))]
async fn repositories(config: &Config) -> anyhow::Result<Repositories> {
    if config.uses_database() {
        warn!("Built without the postgres feature; ignoring database.url");
    }
    info!("Using in-memory storage");
    Ok(Repositories::memory())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
