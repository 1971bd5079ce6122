//! unstall - removes stalled Deluge torrents from the Sonarr and Radarr queues
//!
//! Main entry point for the command-line application.
//!
//! # Execution Flow
//!
//! 1. Parse the command line
//! 2. Load configuration: defaults, then `unstall.yaml` (or `--config`), then environment
//! 3. Apply command-line overrides and validate
//! 4. Initialize logging (console, plus a daily rolling file when `log_dir` is set)
//! 5. Create tokio runtime
//! 6. Build and connect the Deluge, Sonarr and Radarr clients (concurrently)
//! 7. Run one cycle (`--once`) or the scheduler until Ctrl-C
//! 8. Log the metrics summary and shut down

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use std::sync::Arc;
use unstall::bootstrap::bootstrap;
use unstall::{APP_NAME, ConfigManager, Metrics, Scheduler, Settings, VERSION};

const WORKER_THREADS: usize = 2;

/// Detects stalled Deluge torrents and blocklists them in Sonarr and Radarr.
#[derive(Parser, Debug)]
#[command(name = "unstall")]
#[command(version)]
struct Cli {
    /// YAML config file (default: ./unstall.yaml if present).
    #[arg(short, long, env = "UNSTALL_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,

    /// Log what would be removed without changing anything.
    #[arg(long)]
    pretend: bool,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Write a config template with the defaults to PATH and exit.
    #[arg(long, value_name = "PATH")]
    write_config: Option<Utf8PathBuf>,
}

impl Cli {
    /// Flags only ever switch a setting on.
    fn apply(&self, settings: &mut Settings) {
        settings.pretend |= self.pretend;
        settings.debug |= self.debug;
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.write_config {
        ConfigManager::write_template(path)?;
        println!("Wrote config template to {}", path);
        return Ok(());
    }

    let config_manager = ConfigManager::new(cli.config.clone());
    let mut settings = config_manager.load()?;
    cli.apply(&mut settings);
    settings.validate().context("Invalid configuration")?;

    // Held until exit so buffered file output is flushed
    let _log_guard = unstall::logging::setup_logging(
        settings.log_dir.as_deref(),
        APP_NAME,
        settings.debug,
        settings.log_json,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    if settings.pretend {
        tracing::info!("Pretend mode: nothing will be removed or searched");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(WORKER_THREADS)
        .thread_name("unstall-worker")
        .build()
        .context("Failed to build tokio runtime")?;

    let result = runtime.block_on(run(settings, cli.once));

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    tracing::info!("Shutdown complete");

    result
}

async fn run(settings: Settings, once: bool) -> Result<()> {
    let metrics = Arc::new(Metrics::new());
    let processor = Arc::new(bootstrap(&settings, metrics.clone()).await?);

    if once {
        processor.run_cycle().await.context("Cycle failed")?;
    } else {
        let scheduler = Scheduler::new(
            processor,
            settings.refresh_duration,
            settings.run_on_startup,
        );
        scheduler.run(shutdown_signal()).await;
    }

    metrics.log_summary();
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl-C, stopping"),
        Err(err) => {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    }
}
