//! Chart command

use anyhow::{Context, Result};

use datasight_core::tools::{self, ToolContext, VisualizeParams};

use super::{print_json, viz_request};
use crate::cli::{ChartArgs, ReadArgs};

pub fn cmd_chart(ctx: &ToolContext, file_id: &str, chart: &ChartArgs, read: &ReadArgs) -> Result<()> {
    let viz = viz_request(chart)?.context("A chart needs --x and --y")?;
    let params = VisualizeParams {
        file_id: file_id.to_string(),
        viz,
        delimiter: read.delimiter.clone(),
        encoding: read.encoding.clone(),
    };
    let result = tools::visualize(ctx, params)
        .with_context(|| format!("Failed to render chart for dataset {}", file_id))?;

    eprintln!("Chart written to {}", result.chart.chart_path.display());
    print_json(&result)
}
