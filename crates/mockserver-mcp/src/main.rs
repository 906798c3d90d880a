use anyhow::Context as _;
use clap::Parser as _;
use rmcp::ServiceExt as _;
use rmcp::transport::stdio;
use tracing::info;
use tracing_subscriber::EnvFilter;
use unrelated_mockserver_client::MockServerClient;
use unrelated_mockserver_mcp::MockServerTools;
use unrelated_mockserver_mcp::config::{Cli, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format)?;

    let client = MockServerClient::new(cli.client_config()).context("build MockServer client")?;
    info!(
        base_url = %client.base_url(),
        timeout_ms = cli.timeout_ms,
        "starting MockServer MCP server on stdio"
    );

    let service = MockServerTools::new(client)
        .serve(stdio())
        .await
        .context("start MCP stdio server")?;

    tokio::select! {
        res = service.waiting() => {
            let reason = res.context("MCP server task")?;
            info!(?reason, "MCP session ended");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl-C");
        }
    }

    info!("shutting down");
    Ok(())
}

/// Logs go to stderr: stdout carries the MCP protocol.
fn init_tracing(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}
