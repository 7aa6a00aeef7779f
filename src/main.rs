//! batch-gateway - HTTP gateway for partitioned batch writes
//!
//! Loads configuration, sets up logging and serves the product batch routes.

#![allow(missing_docs)]

use anyhow::Context;
use clap::Parser;
use dynamo_batch::config::Config;
use dynamo_batch::server;
use dynamo_batch::utils::logging::{LoggingOptions, init_logging};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};

#[derive(Debug, Parser)]
#[command(name = "batch-gateway", version, about)]
struct Cli {
    /// Configuration file; defaults and environment apply when it is absent
    #[arg(short, long, default_value = "config/gateway.yaml")]
    config: PathBuf,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(long)]
    port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long, env = "BATCH_GATEWAY_JSON_LOGS")]
    json_logs: bool,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(&cli.config)
        .await
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    if let Some(host) = cli.host {
        config.gateway.server.host = host;
    }
    if let Some(port) = cli.port {
        config.gateway.server.port = port;
    }
    config.validate().context("validating configuration")?;
    debug!(config = ?config, "Configuration loaded");

    server::run_server_with(config)
        .await
        .context("running HTTP server")
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to read .env file: {}", e);
        }
    }

    let cli = Cli::parse();
    init_logging(&LoggingOptions::default().json(cli.json_logs));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
