//! Group-by aggregation and x axis ordering for charts

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::analysis::{is_missing, median_of_sorted, parse_number, Table};
use crate::error::{Error, Result};
use crate::models::{Aggregation, ChartKind, VisualizationSpec};

/// Values sampled when deciding whether x holds dates
const TIME_SAMPLE_SIZE: usize = 30;

/// Aggregated series ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub axis: AxisKind,
}

impl ChartData {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn is_time_axis(&self) -> bool {
        self.axis == AxisKind::Time
    }
}

/// How x values are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    Category,
    Numeric,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeSource {
    DateText,
    EpochSeconds,
    EpochMillis,
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

fn date_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}",
            r"^\d{1,2}[-/]\d{1,2}[-/]\d{2,4}",
            r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Whether a value looks like a date or timestamp string
pub fn looks_like_date(value: &str) -> bool {
    let value = value.trim();
    date_patterns().iter().any(|re| re.is_match(value))
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%m-%d-%Y", "%d-%m-%Y"];

/// Parse a date-like string into a timestamp
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Decide whether a column should be plotted on a time axis
///
/// Text columns qualify when at least `max(3, 60%)` of the first 30 present
/// values look like dates and every present value parses. Numeric columns
/// qualify when their median looks like a Unix timestamp in seconds
/// (> 1e9) or milliseconds (> 1e12).
fn detect_time_axis(values: &[&str]) -> Option<TimeSource> {
    let present: Vec<&str> = values.iter().copied().filter(|v| !is_missing(v)).collect();
    if present.is_empty() {
        return None;
    }

    let numbers: Option<Vec<f64>> = present.iter().map(|v| parse_number(v)).collect();
    if let Some(mut numbers) = numbers {
        numbers.sort_by(|a, b| a.total_cmp(b));
        let q50 = median_of_sorted(&numbers);
        return if q50 > 1e12 {
            Some(TimeSource::EpochMillis)
        } else if q50 > 1e9 {
            Some(TimeSource::EpochSeconds)
        } else {
            None
        };
    }

    let sample: Vec<&str> = present.iter().copied().take(TIME_SAMPLE_SIZE).collect();
    let hits = sample.iter().filter(|v| looks_like_date(v)).count();
    let threshold = std::cmp::max(3, (sample.len() as f64 * 0.6) as usize);
    if hits >= threshold && present.iter().all(|v| parse_datetime(v).is_some()) {
        Some(TimeSource::DateText)
    } else {
        None
    }
}

fn to_datetime(value: &str, source: TimeSource) -> Option<NaiveDateTime> {
    match source {
        TimeSource::DateText => parse_datetime(value),
        TimeSource::EpochSeconds => {
            let secs = parse_number(value)?;
            DateTime::from_timestamp(secs.trunc() as i64, 0).map(|d| d.naive_utc())
        }
        TimeSource::EpochMillis => {
            let millis = parse_number(value)?;
            DateTime::from_timestamp_millis(millis.trunc() as i64).map(|d| d.naive_utc())
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.time() == chrono::NaiveTime::MIN {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

fn reduce(agg: Aggregation, values: &mut [f64]) -> Option<f64> {
    if agg == Aggregation::Count {
        return Some(values.len() as f64);
    }
    if agg == Aggregation::Sum {
        return Some(values.iter().sum());
    }
    if values.is_empty() {
        return None;
    }
    match agg {
        Aggregation::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
        Aggregation::Median => {
            values.sort_by(|a, b| a.total_cmp(b));
            Some(median_of_sorted(values))
        }
        Aggregation::Min => values.iter().copied().reduce(f64::min),
        Aggregation::Max => values.iter().copied().reduce(f64::max),
        Aggregation::Sum | Aggregation::Count => None,
    }
}

/// Group `y` by `x` and apply the aggregation
///
/// Groups are ordered chronologically on a time axis, numerically when x is
/// numeric and lexicographically otherwise. Rows with a missing x are
/// dropped.
pub fn aggregate(table: &Table, spec: &VisualizationSpec) -> Result<ChartData> {
    let x_idx = table
        .column_index(&spec.x)
        .ok_or_else(|| Error::Render(format!("Column '{}' not found", spec.x)))?;
    let y_idx = table
        .column_index(&spec.y)
        .ok_or_else(|| Error::Render(format!("Column '{}' not found", spec.y)))?;

    if spec.agg != Aggregation::Count {
        let dtype = table.dtype(y_idx);
        if dtype != "int64" && dtype != "float64" {
            return Err(Error::Render(format!(
                "Column '{}' must be numeric for agg='{}'",
                spec.y, spec.agg
            )));
        }
    }

    let x_values: Vec<&str> = table.column(x_idx).collect();
    let time_source = if spec.kind == ChartKind::Line {
        detect_time_axis(&x_values)
    } else {
        None
    };
    let numeric_x = time_source.is_none()
        && x_values
            .iter()
            .filter(|v| !is_missing(v))
            .all(|v| parse_number(v).is_some());
    let axis = match (time_source, numeric_x) {
        (Some(_), _) => AxisKind::Time,
        (None, true) => AxisKind::Numeric,
        (None, false) => AxisKind::Category,
    };

    let mut groups: HashMap<String, (SortKey, Vec<f64>)> = HashMap::new();
    for (x_raw, y_raw) in x_values.iter().zip(table.column(y_idx)) {
        if is_missing(x_raw) {
            continue;
        }
        let (label, key) = match (axis, time_source) {
            (AxisKind::Time, Some(source)) => match to_datetime(x_raw, source) {
                Some(dt) => (
                    format_datetime(&dt),
                    SortKey::Number(dt.and_utc().timestamp_millis() as f64),
                ),
                None => continue,
            },
            (AxisKind::Numeric, _) => match parse_number(x_raw) {
                Some(n) => (format_number(n), SortKey::Number(n)),
                None => continue,
            },
            _ => (x_raw.trim().to_string(), SortKey::Text(x_raw.trim().to_string())),
        };

        let entry = groups.entry(label).or_insert_with(|| (key, Vec::new()));
        if is_missing(y_raw) {
            continue;
        }
        match spec.agg {
            // count only needs presence
            Aggregation::Count => entry.1.push(1.0),
            _ => {
                if let Some(v) = parse_number(y_raw) {
                    entry.1.push(v);
                }
            }
        }
    }

    let mut rows: Vec<(String, SortKey, f64)> = groups
        .into_iter()
        .filter_map(|(label, (key, mut values))| {
            reduce(spec.agg, &mut values).map(|v| (label, key, v))
        })
        .collect();
    rows.sort_by(|a, b| a.1.compare(&b.1));

    if rows.is_empty() {
        return Err(Error::Render(format!(
            "No data to plot for x='{}', y='{}'",
            spec.x, spec.y
        )));
    }

    let (labels, values) = rows.into_iter().map(|(label, _, v)| (label, v)).unzip();
    Ok(ChartData {
        labels,
        values,
        axis,
    })
}
