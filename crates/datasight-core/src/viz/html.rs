//! Interactive HTML charts (Plotly, loaded from CDN)

use serde_json::json;

use super::aggregate::{AxisKind, ChartData};
use super::svg::escape_xml;
use crate::models::{ChartKind, VisualizationSpec};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Render a chart as a standalone HTML document
pub fn render_html(data: &ChartData, spec: &VisualizationSpec) -> String {
    let trace = match spec.kind {
        ChartKind::Bar => json!({
            "type": "bar",
            "x": data.labels,
            "y": data.values,
            "name": spec.y_label(),
        }),
        ChartKind::Line => json!({
            "type": "scatter",
            "mode": "lines+markers",
            "x": data.labels,
            "y": data.values,
            "name": spec.y_label(),
        }),
        ChartKind::Pie => json!({
            "type": "pie",
            "labels": data.labels,
            "values": data.values,
            "hole": 0.0,
        }),
    };

    let x_axis_type = match data.axis {
        AxisKind::Time => "date",
        AxisKind::Numeric => "linear",
        AxisKind::Category => "category",
    };
    let layout = json!({
        "title": spec.display_title(),
        "template": "plotly_white",
        "hovermode": if spec.kind == ChartKind::Line { "x unified" } else { "closest" },
        "width": (spec.figsize.0 * 100.0).round(),
        "height": (spec.figsize.1 * 100.0).round(),
        "margin": {"l": 40, "r": 20, "t": 60, "b": 40},
        "xaxis": {"title": spec.x, "type": x_axis_type, "showgrid": true},
        "yaxis": {"title": spec.y_label(), "showgrid": true},
    });

    // `</` would close the script element early
    let traces = json!([trace]).to_string().replace("</", "<\\/");
    let layout = layout.to_string().replace("</", "<\\/");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{cdn}"></script>
</head>
<body>
<div id="chart"></div>
<script>
Plotly.newPlot("chart", {traces}, {layout}, {{"responsive": true}});
</script>
</body>
</html>
"#,
        title = escape_xml(&spec.display_title()),
        cdn = PLOTLY_CDN,
        traces = traces,
        layout = layout,
    )
}
