//! Periodic health reporting.
//!
//! Every `[health].interval_secs` the daemon collects the pipeline's
//! flat health snapshot (listener packet count and EPS, parser queue depth,
//! active workers and EPS) and logs it as one structured event.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use syslog_decode_core::health::{HealthData, HealthReporter};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// One health report for the whole daemon.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Daemon uptime in seconds since start.
    pub uptime_secs: u64,
    /// Flat per-stage values, keys sorted.
    pub stages: HealthData,
}

impl DaemonHealth {
    /// Collect a report from `reporter`.
    pub fn collect(reporter: &dyn HealthReporter, started: Instant) -> Self {
        Self {
            uptime_secs: started.elapsed().as_secs(),
            stages: reporter.health_snapshot(),
        }
    }

    /// Current parser backlog, 0 when the key is absent.
    pub fn queue_depth(&self) -> f64 {
        self.stages
            .get("parser_queue_depth")
            .copied()
            .unwrap_or_default()
    }
}

/// Spawn a background task that logs a [`DaemonHealth`] report on every tick
/// until the shutdown signal fires.
pub fn spawn_health_task(
    reporter: Arc<dyn HealthReporter>,
    interval: Duration,
    started: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = DaemonHealth::collect(reporter.as_ref(), started);
                    match serde_json::to_string(&report.stages) {
                        Ok(stages) => tracing::info!(
                            uptime_secs = report.uptime_secs,
                            queue_depth = report.queue_depth(),
                            stages = %stages,
                            "pipeline health"
                        ),
                        Err(e) => tracing::warn!(error = %e, "failed to serialize health report"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("health task shutting down");
                    break;
                }
            }
        }
    })
}
