//! Report handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{AppError, AppState};
use datasight_core::tools::{self, ReportParams};
use datasight_core::ReportArtifact;

/// POST /api/datasets/:id/report - Run analysis, chart and insight as one report
///
/// Invalid parameters answer 400. Once the pipeline runs the response is
/// always 200; an unreadable dataset yields `status: "error"` in the body.
pub async fn create_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut params): Json<ReportParams>,
) -> Result<Json<ReportArtifact>, AppError> {
    params.file_id = id;
    let artifact = tools::report(&state.tools, params)
        .await
        .map_err(AppError::from_core)?;
    Ok(Json(artifact))
}
