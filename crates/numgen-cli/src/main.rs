#![doc = include_str!("../README.md")]

mod cli;

use anyhow::bail;
use clap::Parser;
use cli::config::CliArgs;
use cli::sink::MeteredSink;
use cli::telemetry::{
    increment_run_errors, increment_runs, init_telemetry, record_run_duration, shutdown_telemetry,
};
use numgen::{ConsoleSink, NumberPool, PoolConfig, RunReport};
use std::time::Instant;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = PoolConfig::try_from(args)?;

    let providers = init_telemetry()?;
    log_startup_info(&config);

    let started = Instant::now();
    let result = run(&config).await;
    record_run_duration(started.elapsed().as_secs_f64() * 1000.0);

    match &result {
        Ok(report) => {
            increment_runs();
            tracing::info!(
                "Collected {} values from {} emissions in {:?}",
                report.values.len(),
                report.emitted,
                started.elapsed()
            );
        }
        Err(err) => {
            increment_run_errors();
            tracing::error!("Run failed: {err:#}");
        }
    }

    shutdown_telemetry(providers);
    result.map(|_| ())
}

async fn run(config: &PoolConfig) -> anyhow::Result<RunReport> {
    let pool = NumberPool::spawn(config, MeteredSink::new(ConsoleSink::new()))?;
    let report = pool.run_until(shutdown_signal()).await?;

    if !report.completed {
        bail!(
            "interrupted after collecting {} of {} values",
            report.values.len(),
            config.ceiling
        );
    }
    Ok(report)
}

fn log_startup_info(config: &PoolConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting generator pool with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting {} generators over [0, {})",
            config.workers,
            config.ceiling
        );
    }
}

/// Resolves on Ctrl+C or SIGTERM. If a handler cannot be installed, that
/// source never fires.
async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Shutdown signal received, stopping generators...");
}
