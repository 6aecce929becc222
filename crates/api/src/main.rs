//! DealCRM API server entrypoint

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dealcrm_api::{routes, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let migration_pool = dealcrm_shared::create_migration_pool(&config.database_url)
        .await
        .context("failed to connect for migrations")?;
    dealcrm_shared::run_migrations(&migration_pool)
        .await
        .context("failed to run migrations")?;
    migration_pool.close().await;

    let pool = dealcrm_shared::create_pool(&config.database_url)
        .await
        .context("failed to create database pool")?;

    let bind_address = config.bind_address.clone();
    let state = AppState::new(pool, config);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;
    tracing::info!("listening on {}", bind_address);

    axum::serve(listener, app)
        .await
        .context("server exited with error")?;

    Ok(())
}
