//! Data models for Datasight

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ========== Dataset reading ==========

/// Text encodings accepted for uploaded and stored datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// UTF-8 with an optional byte-order mark
    Utf8Sig,
    Latin1,
}

impl TextEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf8Sig => "utf-8-sig",
            Self::Latin1 => "latin-1",
        }
    }

    /// Decode raw file bytes into text
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|e| Error::Parse(format!("invalid utf-8 data: {}", e))),
            Self::Utf8Sig => {
                let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| Error::Parse(format!("invalid utf-8 data: {}", e)))
            }
            Self::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }

    /// Encode text for storage
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            Self::Utf8 | Self::Utf8Sig => Ok(text.as_bytes().to_vec()),
            Self::Latin1 => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        Error::InvalidData(format!("character '{}' is not representable in latin-1", c))
                    })
                })
                .collect(),
        }
    }
}

impl std::str::FromStr for TextEncoding {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "" | "utf-8" | "utf8" => Ok(Self::Utf8),
            "utf-8-sig" | "utf8-sig" => Ok(Self::Utf8Sig),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Ok(Self::Latin1),
            other => Err(Error::InvalidData(format!(
                "Unsupported encoding '{}'. Allowed: ['utf-8', 'utf-8-sig', 'latin-1']",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delimiter/encoding hints passed to the analysis and chart collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub delimiter: u8,
    pub encoding: TextEncoding,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: TextEncoding::Utf8,
        }
    }
}

impl ReadOptions {
    /// Parse the string hints used by the tool layer
    pub fn parse(delimiter: &str, encoding: &str) -> Result<Self> {
        let delimiter = match delimiter {
            "" => b',',
            "\\t" | "tab" => b'\t',
            d if d.len() == 1 => d.as_bytes()[0],
            d => {
                return Err(Error::InvalidData(format!(
                    "Delimiter must be a single character, got '{}'",
                    d
                )))
            }
        };
        Ok(Self {
            delimiter,
            encoding: encoding.parse()?,
        })
    }

    pub fn delimiter_str(&self) -> String {
        (self.delimiter as char).to_string()
    }
}

/// One dataset row keyed by column name, used as prompt material
pub type SampleRow = serde_json::Map<String, serde_json::Value>;

/// Receipt returned after persisting an uploaded dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub status: String,
    pub file_id: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub delimiter: String,
    pub encoding: String,
    /// Sheet the data came from (Excel uploads only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
}

// ========== Analysis ==========

/// Column name and inferred type (`int64`, `float64`, `bool`, `object`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
}

impl ColumnInfo {
    pub fn is_numeric(&self) -> bool {
        self.dtype == "int64" || self.dtype == "float64"
    }
}

/// Descriptive statistics for one numeric column
///
/// Fields are `None` when undefined for the data (e.g. `std` of one value).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub count: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<f64>,
}

/// Descriptive statistics for one dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub row_count: usize,
    pub columns: Vec<ColumnInfo>,
    pub numeric_stats: BTreeMap<String, NumericStats>,
}

impl AnalysisResult {
    /// Numeric columns with their stats, in dataset column order
    pub fn numeric_columns(&self) -> Vec<(&str, &NumericStats)> {
        self.columns
            .iter()
            .filter_map(|c| {
                self.numeric_stats
                    .get(&c.name)
                    .map(|stats| (c.name.as_str(), stats))
            })
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

/// How much of the analysis to include in a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Summary,
    None,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::None => "none",
        }
    }
}

impl std::str::FromStr for AnalysisMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "" | "none" => Ok(Self::None),
            _ => Err(Error::Config(format!(
                "Unsupported analysis '{}'. Allowed: ['summary','none']",
                s
            ))),
        }
    }
}

// ========== Visualization ==========

/// Chart family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bar => "barchart",
            Self::Line => "linechart",
            Self::Pie => "piechart",
        }
    }
}

/// Static image (SVG) or interactive document (HTML)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Static,
    Interactive,
}

/// Aggregation applied to y within each x group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Mean,
    Median,
    Min,
    Max,
    Count,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        }
    }
}

impl std::str::FromStr for Aggregation {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "sum" => Ok(Self::Sum),
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "count" => Ok(Self::Count),
            _ => Err(Error::InvalidData(format!(
                "Unsupported agg '{}'. Allowed: ['count', 'max', 'mean', 'median', 'min', 'sum']",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const DEFAULT_FIGSIZE: (f64, f64) = (8.0, 6.0);

/// A requested chart
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationSpec {
    pub kind: ChartKind,
    pub mode: RenderMode,
    pub x: String,
    pub y: String,
    pub agg: Aggregation,
    /// Figure size in inches (width, height)
    pub figsize: (f64, f64),
    pub title: Option<String>,
}

impl VisualizationSpec {
    pub fn new(kind: ChartKind, mode: RenderMode, x: &str, y: &str, agg: Aggregation) -> Self {
        Self {
            kind,
            mode,
            x: x.to_string(),
            y: y.to_string(),
            agg,
            figsize: DEFAULT_FIGSIZE,
            title: None,
        }
    }

    /// Parse a kind label such as `barchart`, `line` or `interactive_piechart`
    pub fn parse_kind(label: &str) -> Result<(ChartKind, RenderMode)> {
        let label = label.trim().to_lowercase();
        let (mode, base) = match label.strip_prefix("interactive_") {
            Some(rest) => (RenderMode::Interactive, rest.to_string()),
            None => (RenderMode::Static, label.clone()),
        };
        let kind = match base.as_str() {
            "barchart" | "bar" => ChartKind::Bar,
            "linechart" | "line" => ChartKind::Line,
            "piechart" | "pie" => ChartKind::Pie,
            _ => {
                return Err(Error::InvalidData(format!(
                    "Unsupported viz.kind '{}'. Allowed: ['barchart', 'linechart', 'piechart'] \
                     (optionally prefixed with 'interactive_')",
                    label
                )))
            }
        };
        Ok((kind, mode))
    }

    /// Kind label as reported in artifacts (`barchart`, `interactive_linechart`, ...)
    pub fn kind_label(&self) -> String {
        match self.mode {
            RenderMode::Static => self.kind.as_str().to_string(),
            RenderMode::Interactive => format!("interactive_{}", self.kind.as_str()),
        }
    }

    /// y axis label, e.g. `sum(sales)`
    pub fn y_label(&self) -> String {
        format!("{}({})", self.agg.as_str(), self.y)
    }

    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("{} by {}", self.y_label(), self.x))
    }
}

/// Chart request as received from the tool layer
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct VizRequest {
    /// barchart | linechart | piechart, optionally prefixed with `interactive_`
    #[serde(default)]
    pub kind: String,
    /// Grouping column
    pub x: String,
    /// Value column
    pub y: String,
    /// sum | mean | median | min | max | count (default sum)
    #[serde(default)]
    pub agg: Option<String>,
    /// Figure size [width, height] in inches (default [8, 6])
    #[serde(default)]
    pub figsize: Option<Vec<f64>>,
    #[serde(default)]
    pub title: Option<String>,
}

impl TryFrom<VizRequest> for VisualizationSpec {
    type Error = Error;

    fn try_from(req: VizRequest) -> Result<Self> {
        let kind_label = if req.kind.trim().is_empty() {
            "barchart"
        } else {
            req.kind.as_str()
        };
        let (kind, mode) = VisualizationSpec::parse_kind(kind_label)?;
        if req.x.trim().is_empty() || req.y.trim().is_empty() {
            return Err(Error::InvalidData("viz requires 'x' and 'y' fields".into()));
        }
        let agg = req.agg.as_deref().unwrap_or("sum").parse()?;

        // Anything but two positive numbers falls back to the default size
        let figsize = match req.figsize.as_deref() {
            Some([w, h]) if *w > 0.0 && *h > 0.0 => (*w, *h),
            _ => DEFAULT_FIGSIZE,
        };

        Ok(Self {
            kind,
            mode,
            x: req.x,
            y: req.y,
            agg,
            figsize,
            title: req.title.filter(|t| !t.trim().is_empty()),
        })
    }
}

/// Chart parameters echoed back in artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartParams {
    pub x: String,
    pub y: String,
    pub agg: Aggregation,
    pub figsize: [f64; 2],
}

/// A rendered chart on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationArtifact {
    /// Kind label, e.g. `barchart` or `interactive_linechart`
    pub kind: String,
    pub params: ChartParams,
    pub chart_path: PathBuf,
    /// Number of categories (bar/pie) or points (line)
    pub categories: usize,
    pub is_time_axis: bool,
}

// ========== Insight ==========

/// Where an insight came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Remote,
    Fallback,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Fallback => "fallback",
        }
    }
}

/// Outcome of insight generation
///
/// Only constructible through [`InsightResult::remote`] and
/// [`InsightResult::fallback`], so `used_fallback` always agrees with
/// `provider`; deserialization enforces the same rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawInsightResult")]
pub struct InsightResult {
    status: String,
    provider: Provider,
    model: Option<String>,
    insights: String,
    used_fallback: bool,
    upstream_error: Option<String>,
}

impl InsightResult {
    pub fn remote(model: &str, insights: String) -> Self {
        Self {
            status: "ok".to_string(),
            provider: Provider::Remote,
            model: Some(model.to_string()),
            insights,
            used_fallback: false,
            upstream_error: None,
        }
    }

    pub fn fallback(insights: String, upstream_error: Option<String>) -> Self {
        Self {
            status: "ok".to_string(),
            provider: Provider::Fallback,
            model: None,
            insights,
            used_fallback: true,
            upstream_error,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn insights(&self) -> &str {
        &self.insights
    }

    pub fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    pub fn upstream_error(&self) -> Option<&str> {
        self.upstream_error.as_deref()
    }
}

#[derive(Deserialize)]
struct RawInsightResult {
    status: String,
    provider: Provider,
    model: Option<String>,
    insights: String,
    used_fallback: bool,
    upstream_error: Option<String>,
}

impl TryFrom<RawInsightResult> for InsightResult {
    type Error = String;

    fn try_from(raw: RawInsightResult) -> std::result::Result<Self, Self::Error> {
        if raw.used_fallback != (raw.provider == Provider::Fallback) {
            return Err(format!(
                "used_fallback={} contradicts provider '{}'",
                raw.used_fallback,
                raw.provider.as_str()
            ));
        }
        Ok(Self {
            status: raw.status,
            provider: raw.provider,
            model: raw.model,
            insights: raw.insights,
            used_fallback: raw.used_fallback,
            upstream_error: raw.upstream_error,
        })
    }
}

/// Per-request AI options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AiOptions {
    /// Per-attempt timeout override; also caps the whole insight stage
    pub timeout: Option<Duration>,
    /// Number of dataset rows to include in the prompt
    pub sample_rows: Option<usize>,
}

/// AI option as received from the tool layer: `true`/`false` or an object
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum AiInput {
    Enabled(bool),
    Options {
        #[serde(default)]
        timeout_secs: Option<f64>,
        #[serde(default)]
        sample_rows: Option<usize>,
    },
}

impl AiInput {
    /// `None` when AI insight was not requested
    pub fn resolve(&self) -> Result<Option<AiOptions>> {
        match self {
            AiInput::Enabled(false) => Ok(None),
            AiInput::Enabled(true) => Ok(Some(AiOptions::default())),
            AiInput::Options {
                timeout_secs,
                sample_rows,
            } => {
                let timeout = match timeout_secs {
                    Some(secs) if *secs > 0.0 => {
                        Some(Duration::try_from_secs_f64(*secs).map_err(|e| {
                            Error::Config(format!("ai.timeout_secs {} is out of range: {}", secs, e))
                        })?)
                    }
                    Some(secs) => {
                        return Err(Error::Config(format!(
                            "ai.timeout_secs must be a positive number, got {}",
                            secs
                        )))
                    }
                    None => None,
                };
                Ok(Some(AiOptions {
                    timeout,
                    sample_rows: *sample_rows,
                }))
            }
        }
    }
}

// ========== Report ==========

/// A single report request
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub dataset_id: String,
    pub analysis_mode: AnalysisMode,
    pub viz: Option<VisualizationSpec>,
    pub ai: Option<AiOptions>,
    pub read: ReadOptions,
    /// Persist the assembled report as an HTML document
    pub export_html: bool,
}

impl ReportRequest {
    pub fn new(dataset_id: &str) -> Self {
        Self {
            dataset_id: dataset_id.to_string(),
            analysis_mode: AnalysisMode::Summary,
            viz: None,
            ai: None,
            read: ReadOptions::default(),
            export_html: false,
        }
    }

    pub fn with_viz(mut self, spec: VisualizationSpec) -> Self {
        self.viz = Some(spec);
        self
    }

    pub fn with_ai(mut self, options: AiOptions) -> Self {
        self.ai = Some(options);
        self
    }

    pub fn with_analysis_mode(mut self, mode: AnalysisMode) -> Self {
        self.analysis_mode = mode;
        self
    }

    pub fn with_read_options(mut self, read: ReadOptions) -> Self {
        self.read = read;
        self
    }

    pub fn with_html_export(mut self, export: bool) -> Self {
        self.export_html = export;
        self
    }
}

/// Overall report status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Ok,
    Error,
}

/// Visualization stage outcome inside a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VisualizationBlock {
    #[serde(rename = "ok")]
    Rendered(VisualizationArtifact),
    Failed { kind: String, error: String },
}

impl VisualizationBlock {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }

    pub fn artifact(&self) -> Option<&VisualizationArtifact> {
        match self {
            Self::Rendered(artifact) => Some(artifact),
            Self::Failed { .. } => None,
        }
    }
}

/// Structured fatal error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
}

impl From<&Error> for ErrorInfo {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Final composite report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportArtifact {
    pub status: ReportStatus,
    pub file_id: String,
    pub csv_path: Option<PathBuf>,
    pub analysis: Option<AnalysisResult>,
    pub viz: Option<VisualizationBlock>,
    pub ai_insights: Option<InsightResult>,
    pub error: Option<ErrorInfo>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub report_path: Option<PathBuf>,
    pub generated_at: DateTime<Utc>,
}

impl ReportArtifact {
    pub fn is_ok(&self) -> bool {
        self.status == ReportStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insight_result_invariant() {
        let remote = InsightResult::remote("model-a", "text".into());
        assert_eq!(remote.provider(), Provider::Remote);
        assert!(!remote.used_fallback());
        assert_eq!(remote.model(), Some("model-a"));

        let fallback = InsightResult::fallback("text".into(), Some("Timeout".into()));
        assert_eq!(fallback.provider(), Provider::Fallback);
        assert!(fallback.used_fallback());
        assert!(fallback.model().is_none());
    }

    #[test]
    fn test_insight_result_shape_is_identical() {
        let remote = serde_json::to_value(InsightResult::remote("m", "a".into())).unwrap();
        let fallback = serde_json::to_value(InsightResult::fallback("b".into(), None)).unwrap();

        let keys = |v: &serde_json::Value| {
            let mut k: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
            k.sort();
            k
        };
        assert_eq!(keys(&remote), keys(&fallback));
        assert_eq!(fallback["provider"], "fallback");
        assert_eq!(fallback["used_fallback"], true);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(
            VisualizationSpec::parse_kind("barchart").unwrap(),
            (ChartKind::Bar, RenderMode::Static)
        );
        assert_eq!(
            VisualizationSpec::parse_kind("Interactive_Line").unwrap(),
            (ChartKind::Line, RenderMode::Interactive)
        );
        assert!(VisualizationSpec::parse_kind("scatter").is_err());
    }

    #[test]
    fn test_viz_request_conversion() {
        let req = VizRequest {
            kind: "interactive_barchart".into(),
            x: "city".into(),
            y: "sales".into(),
            agg: Some("MEAN".into()),
            figsize: Some(vec![6.0, 4.0]),
            title: None,
        };
        let spec = VisualizationSpec::try_from(req).unwrap();
        assert_eq!(spec.agg, Aggregation::Mean);
        assert_eq!(spec.figsize, (6.0, 4.0));
        assert_eq!(spec.kind_label(), "interactive_barchart");
        assert_eq!(spec.y_label(), "mean(sales)");
    }

    #[test]
    fn test_viz_request_bad_figsize_uses_default() {
        let req = VizRequest {
            kind: "bar".into(),
            x: "a".into(),
            y: "b".into(),
            figsize: Some(vec![1.0]),
            ..Default::default()
        };
        let spec = VisualizationSpec::try_from(req).unwrap();
        assert_eq!(spec.figsize, DEFAULT_FIGSIZE);
    }

    #[test]
    fn test_viz_request_requires_fields() {
        let req = VizRequest {
            kind: "bar".into(),
            x: "".into(),
            y: "b".into(),
            ..Default::default()
        };
        assert!(VisualizationSpec::try_from(req).is_err());
    }

    #[test]
    fn test_insight_result_deserialize_checks_provider() {
        let json = serde_json::to_string(&InsightResult::fallback("text".into(), None)).unwrap();
        let parsed: InsightResult = serde_json::from_str(&json).unwrap();
        assert!(parsed.used_fallback());

        let forged = r#"{"status":"ok","provider":"remote","model":"m","insights":"x","used_fallback":true,"upstream_error":null}"#;
        assert!(serde_json::from_str::<InsightResult>(forged).is_err());
    }

    #[test]
    fn test_ai_input_resolution() {
        let off: AiInput = serde_json::from_str("false").unwrap();
        assert!(off.resolve().unwrap().is_none());

        let on: AiInput = serde_json::from_str("true").unwrap();
        assert_eq!(on.resolve().unwrap(), Some(AiOptions::default()));

        let opts: AiInput = serde_json::from_str(r#"{"timeout_secs": 12}"#).unwrap();
        let resolved = opts.resolve().unwrap().unwrap();
        assert_eq!(resolved.timeout, Some(Duration::from_secs(12)));

        let bad: AiInput = serde_json::from_str(r#"{"timeout_secs": -1}"#).unwrap();
        assert!(bad.resolve().is_err());
    }

    #[test]
    fn test_huge_ai_timeout_is_config_error() {
        let huge: AiInput = serde_json::from_str(r#"{"timeout_secs": 1e30}"#).unwrap();
        let err = huge.resolve().unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_analysis_mode_parse() {
        assert_eq!("summary".parse::<AnalysisMode>().unwrap(), AnalysisMode::Summary);
        assert_eq!("".parse::<AnalysisMode>().unwrap(), AnalysisMode::None);
        assert_eq!(
            "full".parse::<AnalysisMode>().unwrap_err().kind(),
            "configuration_error"
        );
    }

    #[test]
    fn test_read_options_parse() {
        let opts = ReadOptions::parse(";", "latin1").unwrap();
        assert_eq!(opts.delimiter, b';');
        assert_eq!(opts.encoding, TextEncoding::Latin1);
        assert_eq!(ReadOptions::parse("\\t", "utf-8").unwrap().delimiter, b'\t');
        assert!(ReadOptions::parse(";;", "utf-8").is_err());
        assert!(ReadOptions::parse(",", "shift-jis").is_err());
    }

    #[test]
    fn test_latin1_roundtrip_rejects_wide_chars() {
        let enc = TextEncoding::Latin1;
        assert_eq!(enc.decode(&enc.encode("café").unwrap()).unwrap(), "café");
        assert!(enc.encode("東京").is_err());
    }

    #[test]
    fn test_visualization_block_serialization() {
        let block = VisualizationBlock::Failed {
            kind: "barchart".into(),
            error: "Column 'nope' not found".into(),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "Column 'nope' not found");
    }
}
