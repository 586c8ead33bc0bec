//! Report orchestration
//!
//! A report request runs Analysis -> Visualization? -> Insight? -> Assembly.
//! Only analysis is load-bearing: its failure ends the request with an
//! error artifact. A failed chart is recorded in the visualization block
//! and a failed insight call degrades to the fallback generator.

mod assembler;
mod html;

pub use assembler::{ReportAssembler, ReportParts};
pub use html::{render_report_html, write_report_html};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::ai::{InsightClient, InsightService};
use crate::analysis::{CsvAnalyzer, DatasetAnalyzer};
use crate::config::{AppConfig, StorageConfig};
use crate::error::Result;
use crate::models::{
    AiOptions, AnalysisResult, InsightResult, ReadOptions, ReportArtifact, ReportRequest,
    SampleRow, VisualizationArtifact, VisualizationBlock, VisualizationSpec,
};
use crate::store::{DatasetStore, LocalDatasetStore};
use crate::viz::{ChartRenderer, FileChartRenderer};

/// Runs report pipelines; cheap to clone and share across requests
#[derive(Clone)]
pub struct ReportOrchestrator {
    store: Arc<dyn DatasetStore>,
    analyzer: Arc<dyn DatasetAnalyzer>,
    renderer: Arc<dyn ChartRenderer>,
    insights: InsightService,
    assembler: ReportAssembler,
    storage: StorageConfig,
    sample_rows: usize,
}

impl ReportOrchestrator {
    /// Wire the local store, CSV analyzer, file renderer and HTTP client
    pub fn new(config: &AppConfig) -> Self {
        let store: Arc<dyn DatasetStore> =
            Arc::new(LocalDatasetStore::new(config.storage.data_dir.clone()));
        Self::with_parts(
            store.clone(),
            Arc::new(CsvAnalyzer::new(store.clone())),
            Arc::new(FileChartRenderer::new(store, config.storage.clone())),
            InsightService::new(InsightClient::new(config.ai.clone())),
            config.storage.clone(),
            config.ai.sample_rows,
        )
    }

    /// Wire explicit collaborators
    pub fn with_parts(
        store: Arc<dyn DatasetStore>,
        analyzer: Arc<dyn DatasetAnalyzer>,
        renderer: Arc<dyn ChartRenderer>,
        insights: InsightService,
        storage: StorageConfig,
        sample_rows: usize,
    ) -> Self {
        Self {
            store,
            analyzer,
            renderer,
            insights,
            assembler: ReportAssembler::new(),
            storage,
            sample_rows,
        }
    }

    pub fn insight_service(&self) -> &InsightService {
        &self.insights
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Stored location of a dataset
    pub fn dataset_path(&self, dataset_id: &str) -> Result<PathBuf> {
        self.store.resolve(dataset_id)
    }

    /// Descriptive statistics for one dataset
    pub fn analyze(&self, dataset_id: &str, read: &ReadOptions) -> Result<AnalysisResult> {
        self.analyzer.analyze(dataset_id, read)
    }

    /// Render one chart
    pub fn visualize(
        &self,
        dataset_id: &str,
        read: &ReadOptions,
        spec: &VisualizationSpec,
    ) -> Result<VisualizationArtifact> {
        self.renderer.render(dataset_id, read, spec)
    }

    /// Insight for a stored dataset
    ///
    /// Fails only when the dataset cannot be analyzed; endpoint failures
    /// come back as a fallback result.
    pub async fn insight_for_dataset(
        &self,
        dataset_id: &str,
        read: &ReadOptions,
        viz: Option<&VisualizationSpec>,
        options: &AiOptions,
    ) -> Result<InsightResult> {
        let analysis = self.analyzer.analyze(dataset_id, read)?;
        let samples = self.load_samples(dataset_id, read, options);
        Ok(self
            .insights
            .generate_insight(&analysis, viz, samples, options)
            .await)
    }

    fn load_samples(&self, dataset_id: &str, read: &ReadOptions, options: &AiOptions) -> Vec<SampleRow> {
        let limit = options.sample_rows.unwrap_or(self.sample_rows);
        if limit == 0 {
            return Vec::new();
        }
        self.analyzer
            .sample_rows(dataset_id, read, limit)
            .unwrap_or_else(|e| {
                warn!(dataset_id, error = %e, "Failed to load sample rows, continuing without");
                Vec::new()
            })
    }

    /// Build a report; never fails for recoverable stages
    pub async fn build_report(&self, request: &ReportRequest) -> ReportArtifact {
        let dataset_id = request.dataset_id.as_str();
        let started = Instant::now();

        // Analysis: mandatory
        let analyzed = self
            .store
            .resolve(dataset_id)
            .and_then(|path| Ok((path, self.analyzer.analyze(dataset_id, &request.read)?)));
        let (csv_path, analysis) = match analyzed {
            Ok(done) => done,
            Err(err) => {
                warn!(dataset_id, stage = "analysis", error = %err, "Report aborted");
                return self.assembler.failure(dataset_id, &err);
            }
        };
        info!(
            dataset_id,
            stage = "analysis",
            outcome = "ok",
            rows = analysis.row_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Report stage complete"
        );

        // Visualization: optional, failure recorded
        let mut rendered_spec = None;
        let viz = request.viz.as_ref().map(|spec| {
            let stage_started = Instant::now();
            match self.renderer.render(dataset_id, &request.read, spec) {
                Ok(artifact) => {
                    info!(
                        dataset_id,
                        stage = "visualization",
                        outcome = "ok",
                        elapsed_ms = stage_started.elapsed().as_millis() as u64,
                        "Report stage complete"
                    );
                    rendered_spec = Some(spec);
                    VisualizationBlock::Rendered(artifact)
                }
                Err(err) => {
                    warn!(dataset_id, stage = "visualization", outcome = "failed", error = %err, "Report stage degraded");
                    VisualizationBlock::Failed {
                        kind: spec.kind_label(),
                        error: err.to_string(),
                    }
                }
            }
        });

        // Insight: optional, always yields a result
        let insight = match &request.ai {
            Some(options) => {
                let stage_started = Instant::now();
                let samples = self.load_samples(dataset_id, &request.read, options);
                let result = self
                    .insights
                    .generate_insight(&analysis, rendered_spec, samples, options)
                    .await;
                info!(
                    dataset_id,
                    stage = "insight",
                    outcome = result.provider().as_str(),
                    elapsed_ms = stage_started.elapsed().as_millis() as u64,
                    "Report stage complete"
                );
                Some(result)
            }
            None => None,
        };

        let mut artifact = self.assembler.assemble(ReportParts {
            file_id: dataset_id.to_string(),
            csv_path,
            analysis,
            analysis_mode: request.analysis_mode,
            viz,
            insight,
            warnings: Vec::new(),
        });

        if request.export_html {
            match write_report_html(&artifact, &self.storage.reports_dir()) {
                Ok(path) => artifact.report_path = Some(path),
                Err(err) => {
                    warn!(dataset_id, stage = "export", error = %err, "HTML export failed");
                    artifact
                        .warnings
                        .push(format!("HTML export failed: {}", err));
                }
            }
        }

        info!(
            dataset_id,
            stage = "assembly",
            outcome = "ok",
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Report complete"
        );
        artifact
    }
}
