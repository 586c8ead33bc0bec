//! Datasight Web Server
//!
//! Axum-based REST API for the Datasight data analysis service.
//!
//! - Uploads (CSV text or base64 workbooks) are limited by [`MAX_UPLOAD_SIZE`]
//! - Dataset errors map to 400/404; anything else is a sanitized 500
//! - Report requests always answer 200 with a report artifact, whose
//!   `status` tells whether the analysis stage succeeded

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};

use datasight_core::{AppConfig, ToolContext};

mod handlers;
pub mod mcp;

/// Maximum request body size (20 MB, base64 workbooks included)
pub const MAX_UPLOAD_SIZE: usize = 20 * 1024 * 1024;

/// Shared application state
pub struct AppState {
    pub tools: ToolContext,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            tools: ToolContext::new(&config),
            config,
        }
    }
}

/// Create the application router
pub fn create_router(config: AppConfig) -> Router {
    info!(
        data_dir = %config.storage.data_dir.display(),
        output_dir = %config.storage.output_dir.display(),
        "Dataset storage configured"
    );
    if config.ai.api_key.is_some() {
        info!(endpoint = %config.ai.base_url, model = %config.ai.model, "Insight endpoint configured");
    } else {
        info!("Insight endpoint has no API key; insights will use the rule-based fallback");
    }

    create_router_with_state(Arc::new(AppState::new(config)))
}

/// Create the router around existing state (for testing)
pub fn create_router_with_state(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Datasets
        .route("/datasets", post(handlers::upload_csv))
        .route("/datasets/excel", post(handlers::upload_excel))
        .route("/datasets/:id/summary", get(handlers::dataset_summary))
        // Charts, insights and reports
        .route("/datasets/:id/charts", post(handlers::create_chart))
        .route("/datasets/:id/insights", post(handlers::create_insight))
        .route("/datasets/:id/report", post(handlers::create_report));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the server
pub async fn serve(config: AppConfig, host: &str, port: u16) -> anyhow::Result<()> {
    let app = create_router(config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    kind: Option<&'static str>,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: None,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: None,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: None,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map a core error to a response
    ///
    /// Caller mistakes keep their message; I/O and upstream failures are
    /// logged and answered with a generic 500.
    pub fn from_core(err: datasight_core::Error) -> Self {
        use datasight_core::Error;

        let status = match &err {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidData(_)
            | Error::Parse(_)
            | Error::Csv(_)
            | Error::Excel(_)
            | Error::Render(_)
            | Error::Config(_) => StatusCode::BAD_REQUEST,
            _ => return Self::from(err),
        };
        Self {
            status,
            kind: Some(err.kind()),
            message: err.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = match self.kind {
            Some(kind) => Json(serde_json::json!({
                "error": self.message,
                "kind": kind,
            })),
            None => Json(serde_json::json!({
                "error": self.message
            })),
        };

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: None,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
