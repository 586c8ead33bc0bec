//! Tool operations for Datasight
//!
//! Parameter and result types plus the operations behind them. They are used by:
//! 1. The REST API handlers
//! 2. The MCP server for external LLM clients
//! 3. The CLI
//!
//! Parameters arrive as loosely typed strings and are validated here, so every
//! surface reports the same errors for the same input.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::models::{
    AiInput, AiOptions, AnalysisMode, AnalysisResult, InsightResult, ReadOptions,
    ReportArtifact, ReportRequest, UploadReceipt, VisualizationArtifact, VisualizationSpec,
    VizRequest,
};
use crate::report::ReportOrchestrator;
use crate::store::{validate_file_id, LocalDatasetStore};

/// Service name reported by `health`
pub const SERVICE_NAME: &str = "datasight";

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_analysis() -> String {
    "summary".to_string()
}

/// Everything the tool operations need, built once from [`AppConfig`]
#[derive(Clone)]
pub struct ToolContext {
    store: LocalDatasetStore,
    orchestrator: ReportOrchestrator,
}

impl ToolContext {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_orchestrator(
            LocalDatasetStore::new(config.storage.data_dir.clone()),
            ReportOrchestrator::new(config),
        )
    }

    pub fn with_orchestrator(store: LocalDatasetStore, orchestrator: ReportOrchestrator) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    pub fn store(&self) -> &LocalDatasetStore {
        &self.store
    }

    pub fn orchestrator(&self) -> &ReportOrchestrator {
        &self.orchestrator
    }
}

/// Guarded error document returned by tools instead of raising
pub fn error_document(err: &Error) -> serde_json::Value {
    serde_json::json!({
        "status": "error",
        "error": {
            "type": err.kind(),
            "message": err.to_string(),
        }
    })
}

fn checked_id(file_id: &str) -> Result<&str> {
    validate_file_id(file_id)?;
    Ok(file_id)
}

fn parse_viz(viz: Option<VizRequest>) -> Result<Option<VisualizationSpec>> {
    viz.map(VisualizationSpec::try_from).transpose()
}

fn parse_ai(ai: Option<&AiInput>) -> Result<Option<AiOptions>> {
    match ai {
        Some(input) => input.resolve(),
        None => Ok(None),
    }
}

// =============================================================================
// health
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResult {
    pub status: String,
    pub service: String,
    pub version: String,
    pub time: DateTime<Utc>,
}

pub fn health() -> HealthResult {
    HealthResult {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        time: Utc::now(),
    }
}

// =============================================================================
// upload_csv / upload_excel
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UploadCsvParams {
    #[schemars(description = "CSV content as text")]
    pub data: String,

    #[serde(default = "default_delimiter")]
    #[schemars(description = "Field delimiter (single character or 'tab'), default ','")]
    pub delimiter: String,

    #[serde(default = "default_encoding")]
    #[schemars(description = "Storage encoding: utf-8, utf-8-sig or latin-1")]
    pub encoding: String,
}

pub fn upload_csv(ctx: &ToolContext, params: UploadCsvParams) -> Result<UploadReceipt> {
    let read = ReadOptions::parse(&params.delimiter, &params.encoding)?;
    ctx.store.upload_csv(&params.data, &read)
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UploadExcelParams {
    #[schemars(description = "Workbook bytes (xlsx, xls or ods) encoded as base64")]
    pub data_base64: String,

    #[schemars(description = "Sheet to convert; defaults to the first sheet")]
    pub sheet: Option<String>,
}

pub fn upload_excel(ctx: &ToolContext, params: UploadExcelParams) -> Result<UploadReceipt> {
    ctx.store
        .upload_excel(&params.data_base64, params.sheet.as_deref())
}

// =============================================================================
// analyze_summary
// =============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct AnalyzeParams {
    #[serde(default)]
    #[schemars(description = "Dataset id returned by upload_csv")]
    pub file_id: String,

    #[serde(default = "default_delimiter")]
    #[schemars(description = "Field delimiter, default ','")]
    pub delimiter: String,

    #[serde(default = "default_encoding")]
    #[schemars(description = "Text encoding, default utf-8")]
    pub encoding: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResult {
    pub status: String,
    pub file_id: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub analysis: AnalysisResult,
}

pub fn analyze_summary(ctx: &ToolContext, params: AnalyzeParams) -> Result<AnalyzeResult> {
    let file_id = checked_id(&params.file_id)?;
    let read = ReadOptions::parse(&params.delimiter, &params.encoding)?;
    let path = ctx.orchestrator.dataset_path(file_id)?;
    let analysis = ctx.orchestrator.analyze(file_id, &read)?;
    Ok(AnalyzeResult {
        status: "ok".to_string(),
        file_id: file_id.to_string(),
        path,
        analysis,
    })
}

// =============================================================================
// visualize
// =============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct VisualizeParams {
    #[serde(default)]
    #[schemars(description = "Dataset id returned by upload_csv")]
    pub file_id: String,

    #[schemars(
        description = "Chart: {kind: barchart|linechart|piechart (prefix interactive_ for HTML), x, y, agg: sum|mean|median|min|max|count, figsize: [w, h], title}"
    )]
    pub viz: VizRequest,

    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    #[serde(default = "default_encoding")]
    pub encoding: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VisualizeResult {
    pub status: String,
    pub file_id: String,
    #[serde(flatten)]
    pub chart: VisualizationArtifact,
}

pub fn visualize(ctx: &ToolContext, params: VisualizeParams) -> Result<VisualizeResult> {
    let file_id = checked_id(&params.file_id)?;
    let read = ReadOptions::parse(&params.delimiter, &params.encoding)?;
    let spec = VisualizationSpec::try_from(params.viz)?;
    let chart = ctx.orchestrator.visualize(file_id, &read, &spec)?;
    Ok(VisualizeResult {
        status: "ok".to_string(),
        file_id: file_id.to_string(),
        chart,
    })
}

// =============================================================================
// generate_ai_insights
// =============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct InsightParams {
    #[serde(default)]
    #[schemars(description = "Dataset id returned by upload_csv")]
    pub file_id: String,

    #[schemars(description = "Chart the insight should describe (same shape as visualize.viz)")]
    pub viz: Option<VizRequest>,

    #[schemars(description = "Options: {timeout_secs, sample_rows}")]
    pub ai: Option<AiInput>,

    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    #[serde(default = "default_encoding")]
    pub encoding: String,
}

/// Insight for a stored dataset; endpoint failures come back as fallback text
pub async fn generate_ai_insights(ctx: &ToolContext, params: InsightParams) -> Result<InsightResult> {
    let file_id = checked_id(&params.file_id)?;
    let read = ReadOptions::parse(&params.delimiter, &params.encoding)?;
    let spec = parse_viz(params.viz)?;
    // Asking this tool for an insight implies AI even when `ai: false` is passed
    let options = parse_ai(params.ai.as_ref())?.unwrap_or_default();
    ctx.orchestrator
        .insight_for_dataset(file_id, &read, spec.as_ref(), &options)
        .await
}

// =============================================================================
// report
// =============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct ReportParams {
    #[serde(default)]
    #[schemars(description = "Dataset id returned by upload_csv")]
    pub file_id: String,

    #[serde(default = "default_analysis")]
    #[schemars(description = "Analysis mode: summary | none")]
    pub analysis: String,

    #[schemars(description = "Optional chart (same shape as visualize.viz)")]
    pub viz: Option<VizRequest>,

    #[schemars(description = "AI insight: true, false, or {timeout_secs, sample_rows}")]
    pub ai: Option<AiInput>,

    #[serde(default)]
    #[schemars(description = "Also write a standalone HTML report")]
    pub export_html: bool,

    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    #[serde(default = "default_encoding")]
    pub encoding: String,
}

/// Parse report parameters into a [`ReportRequest`]
pub fn report_request(params: ReportParams) -> Result<ReportRequest> {
    let file_id = checked_id(&params.file_id)?;
    let analysis_mode: AnalysisMode = params.analysis.parse()?;
    let read = ReadOptions::parse(&params.delimiter, &params.encoding)?;

    let mut request = ReportRequest::new(file_id)
        .with_analysis_mode(analysis_mode)
        .with_read_options(read)
        .with_html_export(params.export_html);
    if let Some(spec) = parse_viz(params.viz)? {
        request = request.with_viz(spec);
    }
    if let Some(options) = parse_ai(params.ai.as_ref())? {
        request = request.with_ai(options);
    }
    Ok(request)
}

/// Build a report; invalid parameters fail, pipeline failures land in the artifact
pub async fn report(ctx: &ToolContext, params: ReportParams) -> Result<ReportArtifact> {
    let request = report_request(params)?;
    Ok(ctx.orchestrator.build_report(&request).await)
}
