//! Datasight CLI - Dataset analysis with charts and AI insights
//!
//! Usage:
//!   datasight upload sales.csv                      Store a dataset, print its file_id
//!   datasight analyze FILE_ID                       Summary statistics
//!   datasight chart FILE_ID -x city -y sales        Render a chart
//!   datasight report FILE_ID -x city -y sales --ai  Full report
//!   datasight serve --port 3000 --mcp-port 3001     Start REST and MCP servers

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use datasight_core::{AppConfig, ToolContext};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let ctx = ToolContext::new(&config);

    match cli.command {
        Commands::Upload { file, sheet, read } => {
            commands::cmd_upload(&ctx, &file, sheet.as_deref(), &read)
        }
        Commands::Analyze { file_id, read } => commands::cmd_analyze(&ctx, &file_id, &read),
        Commands::Chart {
            file_id,
            chart,
            read,
        } => commands::cmd_chart(&ctx, &file_id, &chart, &read),
        Commands::Insight {
            file_id,
            chart,
            ai,
            read,
        } => commands::cmd_insight(&ctx, &file_id, &chart, &ai, &read).await,
        Commands::Report {
            file_id,
            analysis,
            chart,
            ai,
            ai_options,
            html,
            read,
        } => {
            let ai = ai.then_some(ai_options);
            commands::cmd_report(&ctx, &file_id, &analysis, &chart, ai.as_ref(), html, &read).await
        }
        Commands::Serve {
            port,
            host,
            mcp_port,
        } => commands::cmd_serve(config, &host, port, mcp_port).await,
        Commands::Config => commands::cmd_config(&config),
    }
}
