//! MCP (Model Context Protocol) Server for Datasight
//!
//! Exposes the data analysis tools to LLM clients.
//!
//! # Architecture
//!
//! The MCP server runs on a separate port from the main REST API,
//! using HTTP/SSE (Streamable HTTP) transport.
//!
//! # Example
//!
//! ```bash
//! datasight serve --port 3000 --mcp-port 3001
//! ```
//!
//! # Available Tools
//!
//! - `health` - Service name, version and time
//! - `upload_csv` - Store CSV text and return a file_id
//! - `upload_excel` - Store one sheet of a base64 workbook as CSV
//! - `analyze_summary` - Row count, column types and numeric statistics
//! - `visualize` - Bar, line or pie chart (static SVG or interactive HTML)
//! - `generate_ai_insights` - Narrative insight with rule-based fallback
//! - `report` - Analysis, chart and insight in one artifact
//!
//! Tools never raise: failures come back as
//! `{"status": "error", "error": {"type", "message"}}`.

mod tools;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::Serialize;
use tracing::{info, warn};

use datasight_core::AppConfig;

pub use tools::*;

/// Datasight MCP Server state
#[derive(Clone)]
pub struct DatasightMcpServer {
    /// Store and report pipeline shared by all tools
    tools: ToolContext,
    /// Tool router for MCP operations
    tool_router: ToolRouter<Self>,
}

impl DatasightMcpServer {
    /// Create a new MCP server around the given tool context
    pub fn new(tools: ToolContext) -> Self {
        Self {
            tools,
            tool_router: Self::tool_router(),
        }
    }
}

/// Serialize a tool outcome, turning errors into the guarded error document
fn guarded<T: Serialize>(tool: &str, result: datasight_core::Result<T>) -> CallToolResult {
    let value = match result {
        Ok(value) => serde_json::to_value(&value).unwrap_or_default(),
        Err(e) => {
            warn!(tool, error = %e, "Tool failed");
            error_document(&e)
        }
    };
    CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&value).unwrap_or_default(),
    )])
}

#[tool_handler]
impl ServerHandler for DatasightMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "datasight".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Datasight Data Analysis".to_string()),
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "Datasight analyzes tabular datasets. Upload CSV text (or a base64 workbook) \
                 to get a file_id, then summarize it, chart it, ask for an AI insight, or \
                 build a combined report."
                    .to_string(),
            ),
        }
    }
}

#[tool_router]
impl DatasightMcpServer {
    #[tool(description = "Service healthcheck and version info.")]
    async fn health(&self) -> Result<CallToolResult, McpError> {
        Ok(guarded("health", Ok(tools::health())))
    }

    #[tool(
        description = "Save CSV text and return its file_id, path and size. Newlines are normalized."
    )]
    async fn upload_csv(
        &self,
        Parameters(params): Parameters<UploadCsvParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(guarded("upload_csv", tools::upload_csv(&self.tools, params)))
    }

    #[tool(
        description = "Save one sheet of a base64-encoded xlsx/xls/ods workbook as CSV and return its file_id."
    )]
    async fn upload_excel(
        &self,
        Parameters(params): Parameters<UploadExcelParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(guarded("upload_excel", tools::upload_excel(&self.tools, params)))
    }

    #[tool(
        description = "Load a dataset and return row_count, columns with dtypes, and numeric statistics (count, mean, std, min, median, max)."
    )]
    async fn analyze_summary(
        &self,
        Parameters(params): Parameters<AnalyzeParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(guarded(
            "analyze_summary",
            tools::analyze_summary(&self.tools, params),
        ))
    }

    #[tool(
        description = "Render a bar, line or pie chart of aggregated y grouped by x. Supported agg: sum, mean, median, min, max, count. Prefix the kind with interactive_ for an HTML chart."
    )]
    async fn visualize(
        &self,
        Parameters(params): Parameters<VisualizeParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(guarded("visualize", tools::visualize(&self.tools, params)))
    }

    #[tool(
        description = "Generate a narrative insight for a dataset. Falls back to rule-based text when the AI endpoint is unavailable."
    )]
    async fn generate_ai_insights(
        &self,
        Parameters(params): Parameters<InsightParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = tools::generate_ai_insights(&self.tools, params).await;
        Ok(guarded("generate_ai_insights", result))
    }

    #[tool(
        description = "Build a report: summary analysis, optional chart and optional AI insight. A failed chart or insight does not fail the report."
    )]
    async fn report(
        &self,
        Parameters(params): Parameters<ReportParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = tools::report(&self.tools, params).await;
        Ok(guarded("report", result))
    }
}

/// Start the MCP server on the given port
pub async fn start_mcp_server(config: AppConfig, host: &str, port: u16) -> anyhow::Result<()> {
    use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
    use rmcp::transport::streamable_http_server::StreamableHttpService;

    info!("Starting MCP server at http://{}:{}/mcp", host, port);

    let context = ToolContext::new(&config);
    let service = StreamableHttpService::new(
        move || Ok(DatasightMcpServer::new(context.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("MCP server ready at http://{}/mcp", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            // Wait for shutdown signal
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
