//! MCP Tool implementations for Datasight
//!
//! Re-exports from datasight_core::tools for MCP server use.
//! The actual implementations live in datasight-core so they can be shared
//! with the REST API and the CLI.

pub use datasight_core::tools::{
    // Functions
    analyze_summary,
    error_document,
    generate_ai_insights,
    health,
    report,
    upload_csv,
    upload_excel,
    visualize,
    // Params types
    AnalyzeParams,
    InsightParams,
    ReportParams,
    UploadCsvParams,
    UploadExcelParams,
    VisualizeParams,
    // Context
    ToolContext,
};
