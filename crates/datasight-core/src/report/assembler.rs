//! Report assembly

use std::path::PathBuf;

use chrono::Utc;

use crate::error::Error;
use crate::models::{
    AnalysisMode, AnalysisResult, ErrorInfo, InsightResult, ReportArtifact, ReportStatus,
    VisualizationBlock,
};

/// Stage outputs collected by the orchestrator
#[derive(Debug, Clone)]
pub struct ReportParts {
    pub file_id: String,
    pub csv_path: PathBuf,
    pub analysis: AnalysisResult,
    pub analysis_mode: AnalysisMode,
    pub viz: Option<VisualizationBlock>,
    pub insight: Option<InsightResult>,
    pub warnings: Vec<String>,
}

/// Merges stage outputs into a [`ReportArtifact`]
///
/// Blocks are taken as given; only the analysis is required.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportAssembler;

impl ReportAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(&self, parts: ReportParts) -> ReportArtifact {
        let analysis = match parts.analysis_mode {
            AnalysisMode::Summary => Some(parts.analysis),
            AnalysisMode::None => None,
        };

        ReportArtifact {
            status: ReportStatus::Ok,
            file_id: parts.file_id,
            csv_path: Some(parts.csv_path),
            analysis,
            viz: parts.viz,
            ai_insights: parts.insight,
            error: None,
            warnings: parts.warnings,
            report_path: None,
            generated_at: Utc::now(),
        }
    }

    /// Error artifact for a fatal stage failure, with no partial blocks
    pub fn failure(&self, file_id: &str, err: &Error) -> ReportArtifact {
        ReportArtifact {
            status: ReportStatus::Error,
            file_id: file_id.to_string(),
            csv_path: None,
            analysis: None,
            viz: None,
            ai_insights: None,
            error: Some(ErrorInfo::from(err)),
            warnings: Vec::new(),
            report_path: None,
            generated_at: Utc::now(),
        }
    }
}
