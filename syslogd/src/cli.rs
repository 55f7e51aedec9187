//! CLI argument definitions for syslogd.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use syslog_decode_core::config::SyslogConfig;

/// Syslog UDP receiver and decoder.
///
/// Receives syslog datagrams, decodes RFC 5424, RFC 3164, key-value and
/// plain-text payloads, and optionally re-sends them as RFC 5424.
#[derive(Parser, Debug)]
#[command(name = "syslogd")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to syslog-decode.toml configuration file.
    #[arg(short, long, default_value = "/etc/syslog-decode/syslog-decode.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override the UDP bind address (e.g. 0.0.0.0:514).
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Override the number of decode workers (0 = available parallelism).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Forward every decoded message as RFC 5424 to this address.
    #[arg(long)]
    pub forward: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Apply command-line overrides on top of a loaded configuration.
    ///
    /// The caller is expected to run `SyslogConfig::validate` afterwards.
    pub fn apply_overrides(&self, config: &mut SyslogConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if let Some(bind) = &self.bind {
            config.listener.bind_addr = bind.clone();
        }
        if let Some(threads) = self.threads {
            config.parser.thread_count = threads;
        }
        if let Some(target) = &self.forward {
            config.forward.enabled = true;
            config.forward.target = target.clone();
        }
    }
}
