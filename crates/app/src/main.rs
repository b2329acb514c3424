use clap::Parser;
use std::time::Duration;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use vigil_app::config::Settings;
use vigil_app::runtime;
use vigil_foundation::{AppState, HealthMonitor, ShutdownHandler, StateManager};

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "vigil.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(guard);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::parse();

    init_logging()?;
    tracing::info!("Starting Vigil satellite");

    let state_manager = StateManager::new();
    let _health_monitor = HealthMonitor::new(Duration::from_secs(10)).start();
    let shutdown = ShutdownHandler::new().install().await;

    // The pipeline runs on its own threads; starting it is blocking work
    let handle = tokio::task::spawn_blocking(move || runtime::start(settings))
        .await?
        .map_err(|e| {
            tracing::error!("Failed to start pipeline: {:#}", e);
            e
        })?;

    state_manager.transition(AppState::Listening)?;

    // Supervise until the shutdown signal arrives
    let mut stats_interval = tokio::time::interval(Duration::from_secs(30));
    stats_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown.wait() => {
                tracing::info!("Shutdown signal received");
                break;
            }
            _ = stats_interval.tick() => {
                runtime::log_pipeline_stats(&handle.metrics);
            }
        }
    }

    tracing::info!("Beginning graceful shutdown");
    state_manager.transition(AppState::Stopping)?;

    tokio::task::spawn_blocking(move || handle.shutdown()).await?;

    state_manager.transition(AppState::Stopped)?;
    tracing::info!("Shutdown complete");

    Ok(())
}
