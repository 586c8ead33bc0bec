//! Insight command

use anyhow::{Context, Result};

use datasight_core::tools::{self, InsightParams, ToolContext};

use super::{ai_input, print_json, viz_request};
use crate::cli::{AiArgs, ChartArgs, ReadArgs};

pub async fn cmd_insight(
    ctx: &ToolContext,
    file_id: &str,
    chart: &ChartArgs,
    ai: &AiArgs,
    read: &ReadArgs,
) -> Result<()> {
    let params = InsightParams {
        file_id: file_id.to_string(),
        viz: viz_request(chart)?,
        ai: Some(ai_input(ai)),
        delimiter: read.delimiter.clone(),
        encoding: read.encoding.clone(),
    };
    let result = tools::generate_ai_insights(ctx, params)
        .await
        .with_context(|| format!("Failed to generate insight for dataset {}", file_id))?;

    if let Some(reason) = result.upstream_error() {
        eprintln!("Insight endpoint unavailable ({}); using rule-based insight", reason);
    }
    print_json(&result)
}
