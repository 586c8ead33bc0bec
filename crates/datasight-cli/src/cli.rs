//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Datasight - Analyze, chart and explain tabular datasets
#[derive(Parser)]
#[command(name = "datasight")]
#[command(about = "Dataset analysis with charts and AI insights", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config override file (defaults to ~/.config/datasight/datasight.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// How a stored dataset is read
#[derive(Args, Debug, Clone)]
pub struct ReadArgs {
    /// Field delimiter (single character or "tab")
    #[arg(short, long, default_value = ",")]
    pub delimiter: String,

    /// Text encoding: utf-8, utf-8-sig, latin-1
    #[arg(short, long, default_value = "utf-8")]
    pub encoding: String,
}

/// Chart selection shared by chart, insight and report
#[derive(Args, Debug, Clone, Default)]
pub struct ChartArgs {
    /// Chart kind: barchart, linechart, piechart (prefix interactive_ for HTML)
    #[arg(long, default_value = "barchart")]
    pub kind: String,

    /// Grouping column
    #[arg(short = 'x', long)]
    pub x: Option<String>,

    /// Value column
    #[arg(short = 'y', long)]
    pub y: Option<String>,

    /// Aggregation: sum, mean, median, min, max, count
    #[arg(long, default_value = "sum")]
    pub agg: String,

    /// Chart title
    #[arg(long)]
    pub title: Option<String>,

    /// Figure size in inches, as WIDTHxHEIGHT (e.g. 10x6)
    #[arg(long)]
    pub figsize: Option<String>,
}

/// AI insight options
#[derive(Args, Debug, Clone, Default)]
pub struct AiArgs {
    /// Overall insight timeout in seconds
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Number of dataset rows to include in the prompt
    #[arg(long)]
    pub sample_rows: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a CSV file or a workbook (xlsx, xls, ods) and print its file_id
    Upload {
        /// File to upload
        file: PathBuf,

        /// Sheet to convert (workbooks only; defaults to the first sheet)
        #[arg(long)]
        sheet: Option<String>,

        #[command(flatten)]
        read: ReadArgs,
    },

    /// Print row count, column types and numeric statistics
    Analyze {
        /// Dataset id returned by upload
        file_id: String,

        #[command(flatten)]
        read: ReadArgs,
    },

    /// Render a chart of aggregated y grouped by x
    Chart {
        /// Dataset id returned by upload
        file_id: String,

        #[command(flatten)]
        chart: ChartArgs,

        #[command(flatten)]
        read: ReadArgs,
    },

    /// Generate a narrative insight (rule-based when the endpoint is unavailable)
    Insight {
        /// Dataset id returned by upload
        file_id: String,

        #[command(flatten)]
        chart: ChartArgs,

        #[command(flatten)]
        ai: AiArgs,

        #[command(flatten)]
        read: ReadArgs,
    },

    /// Build a report: summary, optional chart, optional AI insight
    Report {
        /// Dataset id returned by upload
        file_id: String,

        /// Analysis mode: summary or none
        #[arg(long, default_value = "summary")]
        analysis: String,

        #[command(flatten)]
        chart: ChartArgs,

        /// Include an AI insight
        #[arg(long)]
        ai: bool,

        #[command(flatten)]
        ai_options: AiArgs,

        /// Also write a standalone HTML report
        #[arg(long)]
        html: bool,

        #[command(flatten)]
        read: ReadArgs,
    },

    /// Start the REST API server (and optionally the MCP server)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for MCP (Model Context Protocol) server
        ///
        /// When set, starts an MCP server for LLM tool access on the specified port.
        /// Example: --mcp-port 3001
        #[arg(long)]
        mcp_port: Option<u16>,
    },

    /// Show the resolved configuration (API key masked)
    Config,
}
