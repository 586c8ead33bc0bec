//! Report command

use anyhow::{bail, Context, Result};

use datasight_core::tools::{self, ReportParams, ToolContext};

use super::{ai_input, print_json, viz_request};
use crate::cli::{AiArgs, ChartArgs, ReadArgs};

/// Build report parameters from CLI flags
pub fn report_params(
    file_id: &str,
    analysis: &str,
    chart: &ChartArgs,
    ai: Option<&AiArgs>,
    export_html: bool,
    read: &ReadArgs,
) -> Result<ReportParams> {
    Ok(ReportParams {
        file_id: file_id.to_string(),
        analysis: analysis.to_string(),
        viz: viz_request(chart)?,
        ai: ai.map(ai_input),
        export_html,
        delimiter: read.delimiter.clone(),
        encoding: read.encoding.clone(),
    })
}

pub async fn cmd_report(
    ctx: &ToolContext,
    file_id: &str,
    analysis: &str,
    chart: &ChartArgs,
    ai: Option<&AiArgs>,
    export_html: bool,
    read: &ReadArgs,
) -> Result<()> {
    let params = report_params(file_id, analysis, chart, ai, export_html, read)?;
    let artifact = tools::report(ctx, params)
        .await
        .with_context(|| format!("Invalid report request for dataset {}", file_id))?;

    print_json(&artifact)?;
    if let Some(path) = &artifact.report_path {
        eprintln!("HTML report written to {}", path.display());
    }
    for warning in &artifact.warnings {
        eprintln!("warning: {}", warning);
    }
    if let Some(err) = &artifact.error {
        bail!("Report failed ({}): {}", err.kind, err.message);
    }
    Ok(())
}
