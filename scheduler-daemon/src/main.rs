//! Scheduler daemon entry point (§6.4): loads a YAML job configuration,
//! validates it, bootstraps catalog credentials, and runs the cron-like
//! job scheduler until a shutdown signal arrives.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use mosaic_catalog::cdse::{CdseCatalogClient, CdseCredentials};
use mosaic_catalog::{CatalogClient, Downloader, FsDownloader};
use mosaic_config::SchedulerConfig;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod aoi;
mod job;
mod scheduler;
mod signals;

#[derive(Parser, Debug)]
#[command(name = "scheduler-daemon", about = "Cron-like mosaic selection job scheduler")]
struct Args {
    /// Path to the YAML job configuration.
    #[arg(long)]
    config: PathBuf,

    /// Run as a long-lived daemon instead of exiting after one pass.
    #[arg(long)]
    daemon: bool,

    /// Write the process id to this file on start, remove it on exit.
    #[arg(long)]
    pid_file: Option<PathBuf>,

    /// DEBUG, INFO, WARNING, or ERROR.
    #[arg(long, default_value = "INFO")]
    log_level: String,

    /// Parse and validate the config, then exit without running anything.
    #[arg(long)]
    validate_only: bool,
}

fn init_tracing(log_level: &str) {
    let level = match log_level.to_ascii_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" => "warn",
        "ERROR" => "error",
        _ => "info",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("scheduler_daemon={level},{level}")),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match run(args).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "scheduler-daemon exiting with failure");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = SchedulerConfig::from_path(&args.config)?;
    info!(jobs = config.jobs.len(), "configuration loaded and validated");

    if args.validate_only {
        info!("--validate-only: configuration is valid, exiting");
        return Ok(());
    }

    if let Some(pid_file) = &args.pid_file {
        std::fs::write(pid_file, std::process::id().to_string())?;
    }

    let credentials = CdseCredentials::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    let catalog: Arc<dyn CatalogClient> = Arc::new(CdseCatalogClient::new(credentials));
    let downloader: Arc<dyn Downloader> =
        Arc::new(FsDownloader::new("https://catalogue.dataspace.copernicus.eu/odata/v1/Products"));

    if args.daemon {
        info!("running in daemon mode (no process detachment, container/systemd supervise this instead)");
    }

    let scheduler = scheduler::Scheduler::new(config, catalog, downloader);
    scheduler.run(signals::wait_for_shutdown()).await;

    if let Some(pid_file) = &args.pid_file {
        let _ = std::fs::remove_file(pid_file);
    }

    Ok(())
}
