//! RateWatch binary.
//!
//! One-shot mode runs a single analysis cycle and writes a report file.
//! Exporter mode keeps refreshing on an interval and serves the latest
//! snapshot over HTTP until SIGINT/SIGTERM.

mod cli;
mod output;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ratewatch_core::CycleService;
use ratewatch_domain::Config;
use ratewatch_infra::{
    config as config_loader, ExporterMetrics, ExporterServer, PrometheusClient, RefreshScheduler,
    RefreshSchedulerConfig, SnapshotSlot,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flags when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
        Err(_) => debug!("No .env file found"),
    }

    let mut config = match &cli.config {
        Some(path) => config_loader::load_from_file(Some(path.clone()))
            .context("failed to load config file")?,
        None => config_loader::load().context("failed to load configuration")?,
    };
    cli.apply_to(&mut config);

    if config.backend.endpoint.is_empty() {
        anyhow::bail!(
            "no backend endpoint configured; set PROMETHEUS_ENDPOINT or provide a config file"
        );
    }

    let backend = Arc::new(PrometheusClient::new(&config.backend)?);
    let service = Arc::new(CycleService::from_config(backend, &config.analysis)?);

    if cli.exporter {
        run_exporter(service, &config).await
    } else {
        run_once(service, &cli).await
    }
}

/// Run one analysis cycle and write the report to the working directory.
async fn run_once(service: Arc<CycleService>, cli: &Cli) -> anyhow::Result<()> {
    let report = service.run_cycle().await.context("analysis cycle failed")?;
    let path = output::write_report(cli.format, &report, Path::new("."))?;

    info!(
        path = %path.display(),
        selected = report.results.len(),
        failed = report.stats.failed,
        "Report written"
    );
    if !cli.quiet {
        println!(
            "{} metrics above threshold ({} failed); report written to {}",
            report.results.len(),
            report.stats.failed,
            path.display()
        );
    }
    Ok(())
}

/// Run the refresh scheduler and exporter endpoint until shutdown.
async fn run_exporter(service: Arc<CycleService>, config: &Config) -> anyhow::Result<()> {
    let slot = SnapshotSlot::default();
    let scheduler_config = RefreshSchedulerConfig {
        interval: Duration::from_secs(config.exporter.refresh_interval_seconds.max(1)),
        ..RefreshSchedulerConfig::default()
    };
    let mut scheduler = RefreshScheduler::new(service, slot.clone(), scheduler_config);
    scheduler.start().await.context("failed to start refresh scheduler")?;

    let metrics = Arc::new(ExporterMetrics::new()?);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.exporter.port));
    let server = ExporterServer::new(addr, slot, metrics);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    let result = server.serve(shutdown).await;

    if let Err(err) = scheduler.stop().await {
        warn!(error = %err, "Refresh scheduler did not stop cleanly");
    }

    result.context("exporter endpoint failed")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
