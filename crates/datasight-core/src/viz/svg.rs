//! Static SVG chart rendering

use std::fmt::Write;

use super::aggregate::ChartData;
use crate::models::{ChartKind, VisualizationSpec};

/// Pixels per inch of figure size
const DPI: f64 = 100.0;

const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 80.0;

const PALETTE: &[&str] = &[
    "#4C72B0", "#DD8452", "#55A868", "#C44E52", "#8172B3", "#937860", "#DA8BC3", "#8C8C8C",
    "#CCB974", "#64B5CD",
];

pub(crate) fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn fmt_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Render a chart as a standalone SVG document
pub fn render_svg(data: &ChartData, spec: &VisualizationSpec) -> String {
    let width = (spec.figsize.0 * DPI).max(200.0);
    let height = (spec.figsize.1 * DPI).max(200.0);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
        w = width,
        h = height
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="28" text-anchor="middle" font-size="16">{}</text>"#,
        width / 2.0,
        escape_xml(&spec.display_title())
    );

    match spec.kind {
        ChartKind::Bar => draw_bars(&mut svg, data, spec, width, height),
        ChartKind::Line => draw_line(&mut svg, data, spec, width, height),
        ChartKind::Pie => draw_pie(&mut svg, data, width, height),
    }

    svg.push_str("</svg>\n");
    svg
}

/// Value range for the y axis, always including zero
fn value_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(0.0_f64, f64::min);
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    if (max - min).abs() < f64::EPSILON {
        (min, min + 1.0)
    } else {
        (min, max)
    }
}

fn draw_axes(svg: &mut String, spec: &VisualizationSpec, width: f64, height: f64, range: (f64, f64)) {
    let plot_bottom = height - MARGIN_BOTTOM;
    let plot_right = width - MARGIN_RIGHT;
    let _ = writeln!(
        svg,
        r#"<line x1="{l}" y1="{t}" x2="{l}" y2="{b}" stroke="black"/><line x1="{l}" y1="{b}" x2="{r}" y2="{b}" stroke="black"/>"#,
        l = MARGIN_LEFT,
        t = MARGIN_TOP,
        b = plot_bottom,
        r = plot_right
    );

    let (min, max) = range;
    for step in 0..=4 {
        let value = min + (max - min) * step as f64 / 4.0;
        let y = scale_y(value, range, height);
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="end" font-size="10">{}</text>"#,
            MARGIN_LEFT - 6.0,
            y + 3.0,
            fmt_value(value)
        );
    }

    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="12">{}</text>"#,
        (MARGIN_LEFT + plot_right) / 2.0,
        height - 12.0,
        escape_xml(&spec.x)
    );
    let _ = writeln!(
        svg,
        r#"<text x="16" y="{y}" text-anchor="middle" font-size="12" transform="rotate(-90 16 {y})">{label}</text>"#,
        y = (MARGIN_TOP + plot_bottom) / 2.0,
        label = escape_xml(&spec.y_label())
    );
}

fn scale_y(value: f64, (min, max): (f64, f64), height: f64) -> f64 {
    let plot_height = height - MARGIN_TOP - MARGIN_BOTTOM;
    height - MARGIN_BOTTOM - (value - min) / (max - min) * plot_height
}

fn x_label(svg: &mut String, x: f64, height: f64, label: &str) {
    let y = height - MARGIN_BOTTOM + 14.0;
    let _ = writeln!(
        svg,
        r#"<text x="{x}" y="{y}" text-anchor="end" font-size="10" transform="rotate(-30 {x} {y})">{label}</text>"#,
        x = x,
        y = y,
        label = escape_xml(label)
    );
}

fn draw_bars(svg: &mut String, data: &ChartData, spec: &VisualizationSpec, width: f64, height: f64) {
    let range = value_range(&data.values);
    draw_axes(svg, spec, width, height, range);

    let plot_width = width - MARGIN_LEFT - MARGIN_RIGHT;
    let slot = plot_width / data.len().max(1) as f64;
    let zero = scale_y(0.0, range, height);

    for (i, (label, value)) in data.labels.iter().zip(&data.values).enumerate() {
        let x = MARGIN_LEFT + slot * i as f64 + slot * 0.1;
        let top = scale_y(*value, range, height);
        let _ = writeln!(
            svg,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"><title>{}: {}</title></rect>"#,
            x,
            top.min(zero),
            slot * 0.8,
            (zero - top).abs(),
            PALETTE[0],
            escape_xml(label),
            fmt_value(*value)
        );
        x_label(svg, x + slot * 0.4, height, label);
    }
}

fn draw_line(svg: &mut String, data: &ChartData, spec: &VisualizationSpec, width: f64, height: f64) {
    let range = value_range(&data.values);
    draw_axes(svg, spec, width, height, range);

    let plot_width = width - MARGIN_LEFT - MARGIN_RIGHT;
    let step = if data.len() > 1 {
        plot_width / (data.len() - 1) as f64
    } else {
        0.0
    };
    let points: Vec<(f64, f64)> = data
        .values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let x = if data.len() > 1 {
                MARGIN_LEFT + step * i as f64
            } else {
                MARGIN_LEFT + plot_width / 2.0
            };
            (x, scale_y(*v, range, height))
        })
        .collect();

    let path: Vec<String> = points.iter().map(|(x, y)| format!("{:.2},{:.2}", x, y)).collect();
    let _ = writeln!(
        svg,
        r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
        path.join(" "),
        PALETTE[0]
    );

    // Thin out labels on long series
    let label_every = (data.len() / 12).max(1);
    for (i, ((x, y), label)) in points.iter().zip(&data.labels).enumerate() {
        let _ = writeln!(
            svg,
            r#"<circle cx="{:.2}" cy="{:.2}" r="3" fill="{}"><title>{}: {}</title></circle>"#,
            x,
            y,
            PALETTE[0],
            escape_xml(label),
            fmt_value(data.values[i])
        );
        if i % label_every == 0 {
            x_label(svg, *x, height, label);
        }
    }
}

fn draw_pie(svg: &mut String, data: &ChartData, width: f64, height: f64) {
    let cx = width / 2.0;
    let cy = (height + MARGIN_TOP) / 2.0;
    let radius = ((width.min(height - MARGIN_TOP)) / 2.0 - 40.0).max(20.0);

    // Negative slices have no meaning on a pie
    let total: f64 = data.values.iter().map(|v| v.max(0.0)).sum();
    if total <= 0.0 {
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="12">no positive values</text>"#,
            cx, cy
        );
        return;
    }

    let mut angle = -std::f64::consts::FRAC_PI_2;
    for (i, (label, value)) in data.labels.iter().zip(&data.values).enumerate() {
        let share = value.max(0.0) / total;
        if share <= 0.0 {
            continue;
        }
        let color = PALETTE[i % PALETTE.len()];
        let sweep = share * std::f64::consts::TAU;
        let end = angle + sweep;

        if share >= 0.9999 {
            let _ = writeln!(
                svg,
                r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}"/>"#,
                cx, cy, radius, color
            );
        } else {
            let (x1, y1) = (cx + radius * angle.cos(), cy + radius * angle.sin());
            let (x2, y2) = (cx + radius * end.cos(), cy + radius * end.sin());
            let large = if sweep > std::f64::consts::PI { 1 } else { 0 };
            let _ = writeln!(
                svg,
                r#"<path d="M{:.2},{:.2} L{:.2},{:.2} A{:.2},{:.2} 0 {} 1 {:.2},{:.2} Z" fill="{}" stroke="white"><title>{}: {}</title></path>"#,
                cx, cy, x1, y1, radius, radius, large, x2, y2, color,
                escape_xml(label),
                fmt_value(*value)
            );
        }

        let mid = angle + sweep / 2.0;
        let (lx, ly) = (cx + radius * 1.15 * mid.cos(), cy + radius * 1.15 * mid.sin());
        let anchor = if mid.cos() >= 0.0 { "start" } else { "end" };
        let _ = writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" text-anchor="{}" font-size="10">{} ({:.1}%)</text>"#,
            lx,
            ly,
            anchor,
            escape_xml(label),
            share * 100.0
        );
        angle = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Aggregation, RenderMode};
    use crate::viz::aggregate::AxisKind;

    fn data() -> ChartData {
        ChartData {
            labels: vec!["Lyon".into(), "Paris & Co".into()],
            values: vec![5.0, 17.0],
            axis: AxisKind::Category,
        }
    }

    #[test]
    fn test_bar_svg_contains_one_rect_per_category() {
        let spec = VisualizationSpec::new(ChartKind::Bar, RenderMode::Static, "city", "sales", Aggregation::Sum);
        let svg = render_svg(&data(), &spec);
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<rect x=").count(), 2);
        assert!(svg.contains("Paris &amp; Co"));
        assert!(svg.contains("sum(sales) by city"));
    }

    #[test]
    fn test_pie_and_line_svg() {
        let pie = VisualizationSpec::new(ChartKind::Pie, RenderMode::Static, "city", "sales", Aggregation::Sum);
        assert_eq!(render_svg(&data(), &pie).matches("<path").count(), 2);

        let line = VisualizationSpec::new(ChartKind::Line, RenderMode::Static, "city", "sales", Aggregation::Sum);
        let svg = render_svg(&data(), &line);
        assert!(svg.contains("<polyline"));
        assert_eq!(svg.matches("<circle").count(), 2);
    }
}
