//! Church API main entry point
//!
//! Serves authentication and account management for the website admin.

use std::sync::Arc;

use account_service::{AccountService, MySqlAccountRepository};
use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use church_api::{build_router, ApiConfig, AppState};

async fn build_state(config: ApiConfig) -> anyhow::Result<AppState> {
    let db_config = match config.db_config() {
        Some(db_config) => db_config.context("invalid DATABASE_URL")?,
        None => {
            tracing::warn!("DATABASE_URL not set; accounts are kept in memory and lost on restart");
            return Ok(AppState::in_memory(config));
        }
    };

    let pool = db::create_pool(&db_config).await?;
    let repository = MySqlAccountRepository::new(pool.clone());
    repository.ensure_schema().await?;

    let accounts = AccountService::new(Arc::new(repository), config.jwt_config())
        .with_email_domain(config.email_domain.clone());
    Ok(AppState::new(accounts, config).with_pool(pool))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "church_api=info,account_service=info,auth=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ApiConfig::from_env();
    tracing::info!("Starting Church API v{}", config.version);
    tracing::debug!("Configuration: {:?}", config);
    if config.uses_development_secret() {
        tracing::warn!("JWT_SECRET_KEY not set; using the development signing secret");
    }

    let addr = config.http_addr.clone();
    let state = build_state(config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
