//! Dataset upload, summary and chart handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::info;

use crate::{AppError, AppState};
use datasight_core::tools::{
    self, AnalyzeParams, AnalyzeResult, UploadCsvParams, UploadExcelParams, VisualizeParams,
    VisualizeResult,
};
use datasight_core::UploadReceipt;

/// POST /api/datasets - Store a CSV dataset
///
/// Body: `{"data": "...", "delimiter": ",", "encoding": "utf-8"}`
pub async fn upload_csv(
    State(state): State<Arc<AppState>>,
    Json(params): Json<UploadCsvParams>,
) -> Result<Json<UploadReceipt>, AppError> {
    let receipt = tools::upload_csv(&state.tools, params).map_err(AppError::from_core)?;
    Ok(Json(receipt))
}

/// POST /api/datasets/excel - Store one sheet of a base64 workbook as CSV
pub async fn upload_excel(
    State(state): State<Arc<AppState>>,
    Json(params): Json<UploadExcelParams>,
) -> Result<Json<UploadReceipt>, AppError> {
    let receipt = tools::upload_excel(&state.tools, params).map_err(AppError::from_core)?;
    Ok(Json(receipt))
}

/// GET /api/datasets/:id/summary - Row count, column types and numeric statistics
///
/// Query: `delimiter`, `encoding` (optional)
pub async fn dataset_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(mut params): Query<AnalyzeParams>,
) -> Result<Json<AnalyzeResult>, AppError> {
    params.file_id = id;
    let result = tools::analyze_summary(&state.tools, params).map_err(AppError::from_core)?;
    Ok(Json(result))
}

/// POST /api/datasets/:id/charts - Render a chart
///
/// Body: `{"viz": {"kind": "barchart", "x": "...", "y": "...", "agg": "sum"}}`
pub async fn create_chart(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut params): Json<VisualizeParams>,
) -> Result<Json<VisualizeResult>, AppError> {
    params.file_id = id;
    let result = tools::visualize(&state.tools, params).map_err(AppError::from_core)?;
    info!(
        file_id = %result.file_id,
        kind = %result.chart.kind,
        chart_path = %result.chart.chart_path.display(),
        "Chart rendered"
    );
    Ok(Json(result))
}
