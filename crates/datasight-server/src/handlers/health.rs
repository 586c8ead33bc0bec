//! Health check handler

use axum::Json;

use datasight_core::tools::{self, HealthResult};

/// GET /api/health - Service name, version and current time
pub async fn health() -> Json<HealthResult> {
    Json(tools::health())
}
