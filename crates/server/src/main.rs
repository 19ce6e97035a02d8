mod bootstrap;
mod health;
mod monitor;
mod scheduler;
mod services;

use std::time::Duration;

use anyhow::Result;
use guildkeeper_core::config::{AppConfig, LoadOptions};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::health::HealthState;
use crate::monitor::WatchlistMonitor;
use crate::scheduler::ScheduleRunner;

fn init_logging(config: &AppConfig) {
    use guildkeeper_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let shutdown = CancellationToken::new();
    let connected = app.gateway.connected_once();

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        HealthState::new(app.db_pool.clone(), app.gateway.readiness()),
        shutdown.clone(),
    )
    .await?;

    let gateway = app.gateway.clone();
    let gateway_task = tokio::spawn(async move { gateway.start().await });
    let scheduler_task = tokio::spawn(
        ScheduleRunner::new(app.services.clone()).run(connected.clone(), shutdown.clone()),
    );
    let monitor_task =
        tokio::spawn(WatchlistMonitor::new(app.services.clone()).run(connected, shutdown.clone()));

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "guildkeeper-server started"
    );
    tokio::signal::ctrl_c().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "guildkeeper-server stopping"
    );

    shutdown.cancel();
    gateway_task.abort();
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let drained = tokio::time::timeout(grace, async {
        let _ = scheduler_task.await;
        let _ = monitor_task.await;
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "background loops did not stop within the grace period"
        );
    }
    app.db_pool.close().await;

    Ok(())
}
