//! Chart rendering
//!
//! # Architecture
//!
//! - `ChartRenderer` trait: the contract the report pipeline depends on
//! - `FileChartRenderer`: aggregates a stored dataset and writes the chart
//!   as SVG (static) or Plotly HTML (interactive)
//! - `aggregate`: group-by, aggregation and x axis ordering

pub mod aggregate;
mod html;
mod svg;

pub use aggregate::{aggregate, AxisKind, ChartData};
pub use html::render_html;
pub use svg::render_svg;
pub(crate) use svg::escape_xml;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::analysis::Table;
use crate::config::StorageConfig;
use crate::error::Result;
use crate::models::{ChartParams, ReadOptions, RenderMode, VisualizationArtifact, VisualizationSpec};
use crate::store::DatasetStore;

/// Renders a chart for a stored dataset
pub trait ChartRenderer: Send + Sync {
    fn render(
        &self,
        dataset_id: &str,
        read: &ReadOptions,
        spec: &VisualizationSpec,
    ) -> Result<VisualizationArtifact>;
}

/// Renderer writing chart files under the configured output directory
#[derive(Clone)]
pub struct FileChartRenderer {
    store: Arc<dyn DatasetStore>,
    storage: StorageConfig,
}

impl FileChartRenderer {
    pub fn new(store: Arc<dyn DatasetStore>, storage: StorageConfig) -> Self {
        Self { store, storage }
    }

    fn output_path(&self, dataset_id: &str, spec: &VisualizationSpec) -> PathBuf {
        let (dir, ext) = match spec.mode {
            RenderMode::Static => (self.storage.charts_dir(), "svg"),
            RenderMode::Interactive => (self.storage.interactive_dir(), "html"),
        };
        let ts = Utc::now().format("%Y%m%dT%H%M%S%3fZ");
        let name = format!(
            "{}_{}_{}_{}_{}_{}.{}",
            safe_component(dataset_id),
            spec.kind.as_str(),
            safe_component(&spec.x),
            safe_component(&spec.y),
            spec.agg,
            ts,
            ext
        );
        dir.join(name)
    }
}

/// Make a value safe to embed in a file name
fn safe_component(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

impl ChartRenderer for FileChartRenderer {
    fn render(
        &self,
        dataset_id: &str,
        read: &ReadOptions,
        spec: &VisualizationSpec,
    ) -> Result<VisualizationArtifact> {
        let table = Table::load(self.store.as_ref(), dataset_id, read)?;
        let data = aggregate(&table, spec)?;
        debug!(
            dataset_id,
            kind = %spec.kind_label(),
            points = data.len(),
            time_axis = data.is_time_axis(),
            "Aggregated chart data"
        );

        let document = match spec.mode {
            RenderMode::Static => render_svg(&data, spec),
            RenderMode::Interactive => render_html(&data, spec),
        };

        let path = self.output_path(dataset_id, spec);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, document)?;
        info!(dataset_id, path = %path.display(), "Rendered chart");

        Ok(VisualizationArtifact {
            kind: spec.kind_label(),
            params: ChartParams {
                x: spec.x.clone(),
                y: spec.y.clone(),
                agg: spec.agg,
                figsize: [spec.figsize.0, spec.figsize.1],
            },
            chart_path: path,
            categories: data.len(),
            is_time_axis: data.is_time_axis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Aggregation, ChartKind};
    use crate::store::LocalDatasetStore;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileChartRenderer, String) {
        let dir = TempDir::new().unwrap();
        let store = LocalDatasetStore::new(dir.path().join("data"));
        let receipt = store
            .upload_csv("city,sales\nParis,10\nLyon,5\nParis,7\n", &ReadOptions::default())
            .unwrap();
        let storage = StorageConfig::new(dir.path().join("data"), dir.path().join("out"));
        let renderer = FileChartRenderer::new(Arc::new(store), storage);
        (dir, renderer, receipt.file_id)
    }

    #[test]
    fn test_render_static_bar() {
        let (dir, renderer, id) = setup();
        let spec = VisualizationSpec::new(ChartKind::Bar, RenderMode::Static, "city", "sales", Aggregation::Sum);
        let artifact = renderer.render(&id, &ReadOptions::default(), &spec).unwrap();

        assert_eq!(artifact.kind, "barchart");
        assert_eq!(artifact.categories, 2);
        assert!(artifact.chart_path.starts_with(dir.path().join("out")));
        assert_eq!(artifact.chart_path.extension().unwrap(), "svg");
        assert!(artifact.chart_path.exists());
    }

    #[test]
    fn test_render_interactive_goes_to_interactive_dir() {
        let (dir, renderer, id) = setup();
        let spec = VisualizationSpec::new(ChartKind::Pie, RenderMode::Interactive, "city", "sales", Aggregation::Count);
        let artifact = renderer.render(&id, &ReadOptions::default(), &spec).unwrap();

        assert_eq!(artifact.kind, "interactive_piechart");
        assert!(artifact.chart_path.starts_with(dir.path().join("out").join("interactive")));
        assert_eq!(artifact.chart_path.extension().unwrap(), "html");
    }

    #[test]
    fn test_render_unknown_column_is_render_error() {
        let (_dir, renderer, id) = setup();
        let spec = VisualizationSpec::new(ChartKind::Bar, RenderMode::Static, "nope", "sales", Aggregation::Sum);
        let err = renderer.render(&id, &ReadOptions::default(), &spec).unwrap_err();
        assert_eq!(err.kind(), "render_error");
    }

    #[test]
    fn test_safe_component() {
        assert_eq!(safe_component("a/b c"), "a_b_c");
    }
}
