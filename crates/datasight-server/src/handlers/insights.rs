//! Insight handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{AppError, AppState};
use datasight_core::tools::{self, InsightParams};
use datasight_core::InsightResult;

/// POST /api/datasets/:id/insights - Generate an insight for a dataset
///
/// Endpoint failures do not fail the request: the response then carries
/// the rule-based text with `used_fallback: true`.
pub async fn create_insight(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut params): Json<InsightParams>,
) -> Result<Json<InsightResult>, AppError> {
    params.file_id = id;
    let result = tools::generate_ai_insights(&state.tools, params)
        .await
        .map_err(AppError::from_core)?;
    Ok(Json(result))
}
