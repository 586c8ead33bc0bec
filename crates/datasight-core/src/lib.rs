//! Datasight Core Library
//!
//! Shared functionality for the Datasight data analysis service:
//! - Layered configuration (embedded defaults, override file, environment)
//! - Dataset storage for CSV and Excel uploads
//! - Descriptive statistics over CSV datasets
//! - Static (SVG) and interactive (HTML) chart rendering
//! - Resilient AI insight client with rule-based fallback
//! - Report orchestration and HTML report export
//! - Tool operations shared by the REST API, MCP server and CLI

pub mod ai;
pub mod analysis;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod store;
pub mod tools;
pub mod viz;

/// Test utilities including a mock completion server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AttemptOutcome, DebugSnapshot, FallbackDecision, FallbackInsightGenerator, FallbackPolicy,
    InsightClient, InsightError, InsightRequest, InsightService,
};
pub use analysis::{CsvAnalyzer, DatasetAnalyzer, Table};
pub use config::{AppConfig, ClientConfig, RequestConfig, StorageConfig};
pub use error::{Error, Result};
pub use models::{
    AiInput, AiOptions, Aggregation, AnalysisMode, AnalysisResult, ChartKind, ColumnInfo,
    InsightResult, NumericStats, Provider, ReadOptions, RenderMode, ReportArtifact,
    ReportRequest, ReportStatus, TextEncoding, UploadReceipt, VisualizationArtifact,
    VisualizationBlock, VisualizationSpec, VizRequest,
};
pub use report::{ReportAssembler, ReportOrchestrator};
pub use store::{validate_file_id, DatasetStore, LocalDatasetStore};
pub use tools::ToolContext;
pub use viz::{ChartRenderer, FileChartRenderer};
