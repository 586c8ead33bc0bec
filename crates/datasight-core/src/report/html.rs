//! Standalone HTML rendering of a report

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::Result;
use crate::models::{ReportArtifact, VisualizationBlock};
use crate::viz::escape_xml;

const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:2em auto;color:#222}\
table{border-collapse:collapse;margin:1em 0}td,th{border:1px solid #ccc;padding:4px 8px;text-align:right}\
th:first-child,td:first-child{text-align:left}.muted{color:#777}.warn{color:#a60}\
.insight{white-space:pre-wrap;background:#f6f6f6;padding:1em;border-radius:4px}";

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

/// Render a report as HTML
///
/// Static SVG charts are inlined when `chart_svg` is given; otherwise the
/// chart is linked by path. Sections follow the artifact order: summary,
/// visualization, insight.
pub fn render_report_html(artifact: &ReportArtifact, chart_svg: Option<&str>) -> String {
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Report {id}</title>\n<style>{style}</style>\n</head>\n<body>\n<h1>Dataset report</h1>\n<p class=\"muted\">file_id {id} &middot; generated {ts}</p>\n",
        id = escape_xml(&artifact.file_id),
        style = STYLE,
        ts = artifact.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );

    if let Some(analysis) = &artifact.analysis {
        html.push_str("<h2>Summary</h2>\n");
        html.push_str(&format!(
            "<p>{} rows, {} columns.</p>\n<table>\n<tr><th>column</th><th>type</th><th>count</th><th>mean</th><th>std</th><th>min</th><th>median</th><th>max</th></tr>\n",
            analysis.row_count,
            analysis.columns.len()
        ));
        for column in &analysis.columns {
            let stats = analysis.numeric_stats.get(&column.name);
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_xml(&column.name),
                escape_xml(&column.dtype),
                fmt_opt(stats.and_then(|s| s.count)),
                fmt_opt(stats.and_then(|s| s.mean)),
                fmt_opt(stats.and_then(|s| s.std)),
                fmt_opt(stats.and_then(|s| s.min)),
                fmt_opt(stats.and_then(|s| s.median)),
                fmt_opt(stats.and_then(|s| s.max)),
            ));
        }
        html.push_str("</table>\n");
    }

    match &artifact.viz {
        Some(VisualizationBlock::Rendered(chart)) => {
            html.push_str(&format!(
                "<h2>Visualization</h2>\n<p>{} &middot; {}({}) by {} &middot; {} groups</p>\n",
                escape_xml(&chart.kind),
                chart.params.agg,
                escape_xml(&chart.params.y),
                escape_xml(&chart.params.x),
                chart.categories
            ));
            match chart_svg {
                Some(svg) => {
                    html.push_str(svg);
                    html.push('\n');
                }
                None => {
                    let path = chart.chart_path.display().to_string();
                    html.push_str(&format!(
                        "<p><a href=\"{p}\">{p}</a></p>\n",
                        p = escape_xml(&path)
                    ));
                }
            }
        }
        Some(VisualizationBlock::Failed { kind, error }) => {
            html.push_str(&format!(
                "<h2>Visualization</h2>\n<p class=\"warn\">{} could not be rendered: {}</p>\n",
                escape_xml(kind),
                escape_xml(error)
            ));
        }
        None => {}
    }

    if let Some(insight) = &artifact.ai_insights {
        html.push_str("<h2>Insights</h2>\n");
        let source = match insight.model() {
            Some(model) => format!("{} ({})", insight.provider().as_str(), model),
            None => insight.provider().as_str().to_string(),
        };
        html.push_str(&format!(
            "<p class=\"muted\">source: {}</p>\n<div class=\"insight\">{}</div>\n",
            escape_xml(&source),
            escape_xml(insight.insights())
        ));
        if let Some(err) = insight.upstream_error() {
            html.push_str(&format!(
                "<p class=\"muted\">upstream error: {}</p>\n",
                escape_xml(err)
            ));
        }
    }

    if !artifact.warnings.is_empty() {
        html.push_str("<h2>Warnings</h2>\n<ul>\n");
        for warning in &artifact.warnings {
            html.push_str(&format!("<li class=\"warn\">{}</li>\n", escape_xml(warning)));
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Write the report document under `dir` and return its path
pub fn write_report_html(artifact: &ReportArtifact, dir: &Path) -> Result<PathBuf> {
    let chart_svg = match &artifact.viz {
        Some(VisualizationBlock::Rendered(chart))
            if chart.chart_path.extension().is_some_and(|e| e == "svg") =>
        {
            fs::read_to_string(&chart.chart_path).ok()
        }
        _ => None,
    };

    fs::create_dir_all(dir)?;
    let ts = Utc::now().format("%Y%m%dT%H%M%S%3fZ");
    let path = dir.join(format!("report_{}_{}.html", artifact.file_id, ts));
    fs::write(&path, render_report_html(artifact, chart_svg.as_deref()))?;
    Ok(path)
}
