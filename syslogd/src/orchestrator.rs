//! Daemon orchestrator -- pipeline lifecycle.
//!
//! Builds the [`SyslogUdpPipeline`] from the loaded configuration, attaches
//! the sinks, starts everything and waits for a shutdown signal.
//!
//! # Shutdown order
//!
//! 1. Health task receives the shutdown broadcast and exits
//! 2. Listener stops (datagrams already queued on the socket are drained)
//! 3. Parser drains its queue, joins its workers, completes subscribers

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use syslog_decode::{PipelineConfig, Subscription, SyslogUdpPipeline};
use syslog_decode_core::config::SyslogConfig;
use syslog_decode_core::health::HealthReporter;
use tokio::sync::broadcast;

use crate::health::{DaemonHealth, spawn_health_task};
use crate::sinks::{ForwardingSink, LoggingSink};

/// Owns the running pipeline and its subscribers.
pub struct Orchestrator {
    config: SyslogConfig,
    pipeline: Arc<SyslogUdpPipeline>,
    logging: Arc<LoggingSink>,
    subscriptions: Vec<Subscription>,
    shutdown_tx: broadcast::Sender<()>,
    start_time: Instant,
}

impl Orchestrator {
    /// Build the pipeline and attach sinks according to `config`.
    ///
    /// Nothing is bound or spawned until [`start`](Self::start).
    pub fn build(config: SyslogConfig) -> Result<Self> {
        let pipeline_config = PipelineConfig::from_core(&config);
        let pipeline = Arc::new(
            SyslogUdpPipeline::new(pipeline_config)
                .map_err(|e| anyhow::anyhow!("failed to build syslog pipeline: {}", e))?,
        );

        let logging = Arc::new(LoggingSink::new());
        let mut subscriptions = vec![pipeline.subscribe(logging.clone())];

        if config.forward.enabled {
            let forwarder = ForwardingSink::new(&config.forward.target)
                .map_err(|e| anyhow::anyhow!("failed to create forwarding sink: {}", e))?;
            subscriptions.push(pipeline.subscribe(Arc::new(forwarder)));
        }

        let (shutdown_tx, _) = broadcast::channel(4);

        tracing::info!(
            bind_addr = %config.listener.bind_addr,
            forward = config.forward.enabled,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            pipeline,
            logging,
            subscriptions,
            shutdown_tx,
            start_time: Instant::now(),
        })
    }

    /// Start the pipeline and return the bound listener address.
    pub fn start(&self) -> Result<SocketAddr> {
        let addr = self
            .pipeline
            .start()
            .map_err(|e| anyhow::anyhow!("failed to start syslog pipeline: {}", e))?;
        tracing::info!(address = %addr, "syslogd listening");
        Ok(addr)
    }

    /// Start, block until SIGTERM/SIGINT, then shut down gracefully.
    pub async fn run(&mut self) -> Result<()> {
        self.start()?;

        let reporter: Arc<dyn HealthReporter> = self.pipeline.clone();
        let health_task = spawn_health_task(
            reporter,
            Duration::from_secs(self.config.health.interval_secs),
            self.start_time,
            self.shutdown_tx.subscribe(),
        );

        let signal = wait_for_shutdown_signal().await?;
        tracing::info!(signal = signal, "shutdown signal received");

        let _ = self.shutdown_tx.send(());
        if let Err(e) = health_task.await {
            tracing::warn!(error = %e, "health task terminated abnormally");
        }

        self.shutdown().await
    }

    /// Stop the pipeline on a blocking thread; stopping joins worker threads.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("stopping syslog pipeline");
        let pipeline = Arc::clone(&self.pipeline);
        tokio::task::spawn_blocking(move || pipeline.stop())
            .await
            .map_err(|e| anyhow::anyhow!("pipeline shutdown task failed: {}", e))?;

        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }

        tracing::info!(
            decoded = self.logging.received(),
            faults = self.logging.faults(),
            uptime_secs = self.start_time.elapsed().as_secs(),
            "syslogd shut down"
        );
        Ok(())
    }

    /// Current health report.
    pub fn health(&self) -> DaemonHealth {
        DaemonHealth::collect(self.pipeline.as_ref(), self.start_time)
    }

    pub fn pipeline(&self) -> &SyslogUdpPipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &SyslogConfig {
        &self.config
    }

    /// Messages seen by the logging sink so far.
    pub fn decoded_count(&self) -> u64 {
        self.logging.received()
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
