use boardroom::auth::JwtAuthenticator;
use boardroom::config::Config;
use boardroom::game::{Collaborators, GameManager};
use boardroom::metrics::Metrics;
use boardroom::repository::SqliteMatchStore;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    let addr = config.addr();

    let pool = SqlitePool::connect(&config.database_url).await?;
    sqlx::migrate!().run(&pool).await?;
    let store = Arc::new(SqliteMatchStore::new(pool));

    let authenticator = match &config.auth_secret {
        Some(secret) => JwtAuthenticator::new(secret),
        None => {
            warn!("AUTH_SECRET is not set, every connection will be rejected");
            JwtAuthenticator::unconfigured()
        }
    };

    let collaborators = Collaborators {
        authenticator: Arc::new(authenticator),
        matches: store.clone(),
        settlement: store,
    };
    let manager = GameManager::new(config.session.clone(), collaborators, Arc::new(Metrics::new()));
    let monitor = manager.spawn_monitor();

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, boardroom::app(manager))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
