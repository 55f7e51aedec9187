//! Subscribers attached to the decoded message stream.
//!
//! - [`LoggingSink`] logs every decoded message at `debug` and counts them.
//! - [`ForwardingSink`] re-serializes every decoded message as RFC 5424 and
//!   sends it to `[forward].target`.

use std::sync::atomic::{AtomicU64, Ordering};

use syslog_decode::{ParsedMessage, Subscriber, SyslogPipelineError, SyslogUdpSender};

/// Logs decoded messages and pipeline faults.
#[derive(Debug, Default)]
pub struct LoggingSink {
    received: AtomicU64,
    faults: AtomicU64,
}

impl LoggingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of decoded messages seen.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Number of faults seen.
    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }
}

impl Subscriber<ParsedMessage> for LoggingSink {
    fn on_next(&self, item: &ParsedMessage) {
        self.received.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            format = item.payload_type.map(|p| p.as_str()).unwrap_or("none"),
            facility = ?item.facility,
            severity = ?item.severity,
            host = item.header.host_name.as_deref().unwrap_or("-"),
            app = item.header.app_name.as_deref().unwrap_or("-"),
            fields = item.data.len(),
            diagnostics = item.diagnostics.len(),
            message = %item.message,
            "decoded syslog message"
        );
    }

    fn on_error(&self, error: &SyslogPipelineError) {
        self.faults.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(error = %error, "pipeline fault");
    }

    fn on_completed(&self) {
        tracing::info!(received = self.received(), "decoded stream completed");
    }
}

/// Sends every decoded message to a remote syslog receiver.
pub struct ForwardingSink {
    sender: SyslogUdpSender,
}

impl ForwardingSink {
    /// Create a sink sending to `target` (`host:port`).
    pub fn new(target: &str) -> Result<Self, SyslogPipelineError> {
        let sender = SyslogUdpSender::new(target)?;
        tracing::info!(target = %sender.target(), "forwarding decoded messages");
        Ok(Self { sender })
    }

    pub fn sender(&self) -> &SyslogUdpSender {
        &self.sender
    }
}

impl Subscriber<ParsedMessage> for ForwardingSink {
    fn on_next(&self, item: &ParsedMessage) {
        if let Err(e) = self.sender.send_message(item) {
            tracing::warn!(error = %e, "failed to forward message");
        }
    }
}

impl std::fmt::Debug for ForwardingSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardingSink")
            .field("target", &self.sender.target())
            .finish()
    }
}
