use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pagerduty_mcp_runtime::{McpCommands, run as run_mcp};

const DEFAULT_LOG_FILTER: &str =
    "pagerduty_mcp=info,pagerduty_mcp_runtime=info,pagerduty_mcp_core=info";

#[derive(Parser)]
#[command(
    name = "pagerduty-mcp",
    version,
    about = "PagerDuty MCP server over stdio"
)]
struct Cli {
    /// PagerDuty REST API base URL
    #[arg(long, env = "PAGERDUTY_API_URL", default_value = "https://api.pagerduty.com")]
    api_url: String,

    /// Log line format on stderr
    #[arg(long, env = "PAGERDUTY_MCP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: McpCommands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Logs go to stderr; stdout carries the MCP frames.
fn init_tracing(format: LogFormat) {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    );
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let code = run_mcp(&cli.api_url, cli.command).await;
    std::process::exit(code);
}
