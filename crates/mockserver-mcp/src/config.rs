//! Command-line / environment configuration.

use clap::{Parser, ValueEnum};
use std::time::Duration;
use unrelated_mockserver_client::{ClientConfig, DEFAULT_HOST, DEFAULT_PORT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Expose a MockServer instance as MCP tools over stdio.
#[derive(Debug, Clone, Parser)]
#[command(name = "unrelated-mockserver-mcp", version, about)]
pub struct Cli {
    /// MockServer host.
    #[arg(long, env = "MOCKSERVER_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// MockServer port.
    #[arg(
        long,
        env = "MOCKSERVER_PORT",
        default_value_t = DEFAULT_PORT,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub port: u16,

    /// Per-request timeout in milliseconds.
    #[arg(
        long,
        env = "MOCKSERVER_TIMEOUT_MS",
        default_value_t = 5000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_ms: u64,

    /// Log filter (e.g. `info`, `debug`, `unrelated_mockserver_client=trace`).
    /// `RUST_LOG` takes precedence when set.
    #[arg(long, env = "MOCKSERVER_MCP_LOG", default_value = "info")]
    pub log_level: String,

    /// Log output format. Logs always go to stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.host.clone(), self.port)
            .with_timeout(Duration::from_millis(self.timeout_ms))
    }
}
