//! DealCRM background worker
//!
//! Runs the scheduled jobs the API servers must not: currently the
//! monthly usage counter reset. Exactly one worker instance should run
//! per environment; the reset itself is idempotent, so an accidental
//! second run only rewrites zeros.

use std::time::Duration;

use anyhow::Context;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dealcrm_entitlements::SubscriptionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = dealcrm_shared::create_pool(&database_url)
        .await
        .context("failed to create database pool")?;

    let scheduler = JobScheduler::new()
        .await
        .context("failed to create scheduler")?;

    // Midnight UTC on the first of every month
    let reset_pool = pool.clone();
    let reset_job = Job::new_async("0 0 0 1 * *", move |_uuid, _lock| {
        let pool = reset_pool.clone();
        Box::pin(async move {
            let store = SubscriptionStore::new(pool);
            match store.reset_monthly_usage().await {
                Ok(count) => {
                    tracing::info!(subscriptions = count, "monthly usage counters reset");
                }
                Err(e) => {
                    tracing::error!(error = %e, "monthly usage reset failed");
                }
            }
        })
    })
    .context("failed to create reset job")?;

    scheduler
        .add(reset_job)
        .await
        .context("failed to schedule reset job")?;

    scheduler.start().await.context("failed to start scheduler")?;
    tracing::info!("worker started");

    // The scheduler runs on background tasks; keep the process alive and
    // surface a heartbeat so a wedged worker is visible in logs.
    loop {
        tokio::time::sleep(Duration::from_secs(300)).await;
        tracing::debug!("worker heartbeat");
    }
}
