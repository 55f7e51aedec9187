use anyhow::Result;
use clap::Parser;

use syslog_decode_core::config::SyslogConfig;
use syslog_decode_daemon::cli::DaemonCli;
use syslog_decode_daemon::orchestrator::Orchestrator;
use syslog_decode_daemon::{logging, metrics_server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // file -> env -> CLI
    let mut config = SyslogConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load {}: {}", cli.config.display(), e))?;
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "syslogd starting");

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
    }

    let mut orchestrator = Orchestrator::build(config)?;
    orchestrator.run().await
}
