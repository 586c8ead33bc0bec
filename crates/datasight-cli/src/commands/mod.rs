//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `datasets` - Upload and summary commands
//! - `charts` - Chart rendering
//! - `insights` - AI insight generation
//! - `reports` - Report generation
//! - `serve` - Web and MCP server command
//! - `config` - Resolved configuration display
//!
//! Data commands print pretty JSON to stdout; logs go to stderr.

pub mod charts;
pub mod config;
pub mod datasets;
pub mod insights;
pub mod reports;
pub mod serve;

// Re-export command functions for main.rs
pub use charts::*;
pub use config::*;
pub use datasets::*;
pub use insights::*;
pub use reports::*;
pub use serve::*;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use datasight_core::{AiInput, VizRequest};

use crate::cli::{AiArgs, ChartArgs};

/// Print a value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Chart request from CLI flags; `None` when no columns were given
pub fn viz_request(chart: &ChartArgs) -> Result<Option<VizRequest>> {
    let (x, y) = match (&chart.x, &chart.y) {
        (None, None) => return Ok(None),
        (Some(x), Some(y)) => (x.clone(), y.clone()),
        _ => bail!("Both --x and --y are required for a chart"),
    };
    let figsize = chart.figsize.as_deref().map(parse_figsize).transpose()?;

    Ok(Some(VizRequest {
        kind: chart.kind.clone(),
        x,
        y,
        agg: Some(chart.agg.clone()),
        figsize,
        title: chart.title.clone(),
    }))
}

/// Parse `WIDTHxHEIGHT` in inches
pub fn parse_figsize(s: &str) -> Result<Vec<f64>> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .with_context(|| format!("Invalid --figsize '{}' (use WIDTHxHEIGHT, e.g. 10x6)", s))?;
    let w: f64 = w.trim().parse().with_context(|| format!("Invalid width in --figsize '{}'", s))?;
    let h: f64 = h.trim().parse().with_context(|| format!("Invalid height in --figsize '{}'", s))?;
    if w <= 0.0 || h <= 0.0 {
        bail!("--figsize dimensions must be positive, got '{}'", s);
    }
    Ok(vec![w, h])
}

/// AI options from CLI flags
pub fn ai_input(ai: &AiArgs) -> AiInput {
    AiInput::Options {
        timeout_secs: ai.timeout,
        sample_rows: ai.sample_rows,
    }
}
