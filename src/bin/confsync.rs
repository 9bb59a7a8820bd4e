//! Confsync Agent Binary
//!
//! Resolves the node's startup configuration and runs the sync loops until
//! the process is terminated.

use anyhow::Context;
use clap::Parser;
use confsync::cluster::{ClusterClient, HttpClusterClient, LogEventRecorder};
use confsync::config::NodeConfig;
use confsync::controller::Controller;
use confsync::logging::{init_logging, LoggingConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Confsync - dynamic configuration agent for cluster nodes
#[derive(Parser)]
#[command(name = "confsync")]
#[command(about = "Dynamic configuration resolution and sync for cluster node agents")]
struct Cli {
    /// Node identity in the cluster
    #[arg(long)]
    node_name: Option<String>,

    /// Control plane base URL
    #[arg(long)]
    api_endpoint: Option<String>,

    /// Local config file path
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Directory for dynamic config checkpoints (enables dynamic config)
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long)]
    log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn logging_config(&self) -> LoggingConfig {
        let mut config = LoggingConfig::default();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.logging_config()).context("failed to initialize logging")?;
    confsync::concurrency::register_panic_hook(|task, payload| {
        eprintln!("fatal: sync loop '{}' panicked: {}", task, payload);
    });

    let controller = Arc::new(
        Controller::new(
            NodeConfig::default(),
            cli.config_file.clone(),
            cli.store_dir.clone(),
        )
        .context("failed to construct configuration controller")?,
    );

    let config = controller
        .bootstrap()
        .context("failed to resolve a startup configuration")?;
    info!(
        dynamic = controller.dynamic_config(),
        sync_period_secs = config.sync_period_secs,
        trial_duration_secs = config.trial_duration_secs,
        "configuration resolved"
    );

    let client = match &cli.api_endpoint {
        Some(endpoint) => Some(Arc::new(
            HttpClusterClient::new(endpoint.clone()).context("failed to build cluster client")?,
        ) as Arc<dyn ClusterClient>),
        None => None,
    };

    controller.start_sync(
        client,
        Arc::new(LogEventRecorder),
        cli.node_name.as_deref().unwrap_or(""),
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for shutdown signal")?;
    info!("shutting down");
    Ok(())
}
