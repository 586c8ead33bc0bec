//! Rule-based insight text from local statistics

use crate::models::{AnalysisResult, NumericStats, VisualizationSpec};

/// Builds insight text without any external call
///
/// Output depends only on its inputs, so repeated calls are byte-identical.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackInsightGenerator;

fn fmt(value: f64) -> String {
    let abs = value.abs();
    if abs != 0.0 && (abs >= 1e9 || abs < 1e-3) {
        format!("{:.3e}", value)
    } else {
        format!("{:.2}", value)
    }
}

impl FallbackInsightGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate insight text; never empty
    pub fn generate(&self, analysis: &AnalysisResult, viz: Option<&VisualizationSpec>) -> String {
        let mut lines = Vec::new();

        lines.push("Automated summary (generated locally from descriptive statistics):".to_string());
        lines.push(String::new());

        let numeric = analysis.numeric_columns();
        lines.push(format!(
            "- The dataset has {} rows and {} columns, {} of them numeric.",
            analysis.row_count,
            analysis.columns.len(),
            numeric.len()
        ));

        let mut described = 0;
        for (name, stats) in &numeric {
            if let Some(line) = describe_column(name, stats) {
                lines.push(line);
                described += 1;
            }
        }
        if described == 0 {
            lines.push(
                "- No numeric statistics are available; consider checking column types or \
                 counting categories."
                    .to_string(),
            );
        }

        if let Some(spec) = viz {
            lines.push(format!(
                "- The {} shows {} for each {}. {}",
                spec.kind_label(),
                spec.y_label(),
                spec.x,
                reading_hint(spec)
            ));
        }

        lines.push(String::new());
        lines.push(
            "Suggested next step: compare groups with the largest and smallest values and look \
             for outliers before drawing conclusions."
                .to_string(),
        );

        lines.join("\n")
    }
}

fn describe_column(name: &str, stats: &NumericStats) -> Option<String> {
    let mean = stats.mean?;
    let mut parts = vec![format!("mean {}", fmt(mean))];
    if let Some(median) = stats.median {
        parts.push(format!("median {}", fmt(median)));
    }
    if let (Some(min), Some(max)) = (stats.min, stats.max) {
        parts.push(format!("range {} to {}", fmt(min), fmt(max)));
    }
    if let Some(std) = stats.std {
        parts.push(format!("std {}", fmt(std)));
    }

    let mut line = format!("- `{}`: {}.", name, parts.join(", "));

    if let (Some(median), Some(std)) = (stats.median, stats.std) {
        if std > 0.0 {
            let skew = (mean - median) / std;
            if skew > 0.2 {
                line.push_str(" The mean sits above the median, so a few large values pull it up.");
            } else if skew < -0.2 {
                line.push_str(" The mean sits below the median, so a few small values pull it down.");
            }
        }
        if mean != 0.0 {
            let cv = std / mean.abs();
            if cv > 1.0 {
                line.push_str(" Values vary widely relative to their average.");
            } else if cv < 0.1 {
                line.push_str(" Values are tightly clustered.");
            }
        }
    }
    Some(line)
}

fn reading_hint(spec: &VisualizationSpec) -> &'static str {
    use crate::models::ChartKind;
    match spec.kind {
        ChartKind::Bar => "Compare bar heights to spot the leading and trailing groups.",
        ChartKind::Line => "Follow the line to see the trend and any turning points.",
        ChartKind::Pie => "Slice sizes show each group's share of the total.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Aggregation, ChartKind, ColumnInfo, RenderMode};
    use std::collections::BTreeMap;

    fn analysis() -> AnalysisResult {
        let mut stats = BTreeMap::new();
        stats.insert(
            "sales".to_string(),
            NumericStats {
                count: Some(3.0),
                mean: Some(20.0),
                std: Some(10.0),
                min: Some(10.0),
                median: Some(15.0),
                max: Some(35.0),
            },
        );
        AnalysisResult {
            row_count: 3,
            columns: vec![
                ColumnInfo { name: "city".into(), dtype: "object".into() },
                ColumnInfo { name: "sales".into(), dtype: "int64".into() },
            ],
            numeric_stats: stats,
        }
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let generator = FallbackInsightGenerator::new();
        let spec = VisualizationSpec::new(ChartKind::Bar, RenderMode::Static, "city", "sales", Aggregation::Sum);
        let a = generator.generate(&analysis(), Some(&spec));
        let b = generator.generate(&analysis(), Some(&spec));
        assert_eq!(a, b);
        assert!(a.contains("3 rows and 2 columns"));
        assert!(a.contains("`sales`: mean 20.00"));
        assert!(a.contains("large values pull it up"));
        assert!(a.contains("sum(sales) for each city"));
    }

    #[test]
    fn test_fallback_without_numeric_stats() {
        let text = FallbackInsightGenerator::new().generate(&AnalysisResult::default(), None);
        assert!(!text.trim().is_empty());
        assert!(text.contains("No numeric statistics"));
    }

    #[test]
    fn test_fallback_tolerates_empty_stats() {
        let mut result = analysis();
        result.numeric_stats.insert("sales".into(), NumericStats::default());
        let text = FallbackInsightGenerator::new().generate(&result, None);
        assert!(text.contains("No numeric statistics"));
    }
}
