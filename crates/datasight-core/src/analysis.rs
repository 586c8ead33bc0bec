//! Dataset loading and descriptive statistics

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use csv::ReaderBuilder;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{AnalysisResult, ColumnInfo, NumericStats, ReadOptions, SampleRow};
use crate::store::DatasetStore;

/// Produces statistics and prompt samples for stored datasets
pub trait DatasetAnalyzer: Send + Sync {
    /// Descriptive statistics, or `NotFound` / `Parse`
    fn analyze(&self, dataset_id: &str, read: &ReadOptions) -> Result<AnalysisResult>;

    /// First `limit` rows keyed by column name
    fn sample_rows(&self, dataset_id: &str, read: &ReadOptions, limit: usize)
        -> Result<Vec<SampleRow>>;
}

/// Values treated as missing
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"];

pub(crate) fn is_missing(value: &str) -> bool {
    MISSING_MARKERS.contains(&value.trim())
}

pub(crate) fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if is_missing(trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A dataset loaded into memory as text cells
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Load a stored dataset
    pub fn load(store: &dyn DatasetStore, dataset_id: &str, read: &ReadOptions) -> Result<Self> {
        let bytes = store.read_bytes(dataset_id)?;
        let text = read.encoding.decode(&bytes)?;
        Self::parse(&text, read.delimiter)
    }

    /// Parse CSV text with a header row
    pub fn parse(text: &str, delimiter: u8) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        if text.trim().is_empty() {
            return Err(Error::Parse("No columns to parse from file".into()));
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(text.as_bytes());

        let headers = dedupe_headers(reader.headers()?.iter().map(|h| h.trim().to_string()));
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            // Fully blank lines are skipped
            if record.iter().all(|v| v.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of one column
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }

    /// Inferred type of one column
    pub fn dtype(&self, index: usize) -> &'static str {
        infer_dtype(self.column(index))
    }
}

/// Duplicate names get a `.N` suffix
fn dedupe_headers(headers: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name.clone()
            } else {
                format!("{}.{}", name, count)
            };
            *count += 1;
            unique
        })
        .collect()
}

/// Infer a column type from its cells
///
/// Integers with missing values widen to `float64`; an all-missing column
/// is `float64`; anything non-numeric is `object`.
pub fn infer_dtype<'a>(values: impl Iterator<Item = &'a str>) -> &'static str {
    let mut any_missing = false;
    let mut present = 0usize;
    let mut all_int = true;
    let mut all_float = true;
    let mut all_bool = true;

    for raw in values {
        let value = raw.trim();
        if is_missing(value) {
            any_missing = true;
            continue;
        }
        present += 1;
        if all_int && value.parse::<i64>().is_err() {
            all_int = false;
        }
        if all_float && parse_number(value).is_none() {
            all_float = false;
        }
        if all_bool && !matches!(value.to_ascii_lowercase().as_str(), "true" | "false") {
            all_bool = false;
        }
    }

    if present == 0 {
        return "float64";
    }
    if all_int {
        return if any_missing { "float64" } else { "int64" };
    }
    if all_float {
        return "float64";
    }
    if all_bool && !any_missing {
        return "bool";
    }
    "object"
}

/// Statistics over the non-missing values of a numeric column
pub fn numeric_stats(values: &[f64]) -> NumericStats {
    let count = values.len();
    if count == 0 {
        return NumericStats {
            count: Some(0.0),
            ..Default::default()
        };
    }

    let n = count as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if count > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(var.sqrt())
    } else {
        None
    };

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    NumericStats {
        count: Some(n),
        mean: Some(mean),
        std,
        min: sorted.first().copied(),
        median: Some(median_of_sorted(&sorted)),
        max: sorted.last().copied(),
    }
}

pub(crate) fn median_of_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Analyzer reading CSV datasets from a [`DatasetStore`]
#[derive(Clone)]
pub struct CsvAnalyzer {
    store: Arc<dyn DatasetStore>,
}

impl CsvAnalyzer {
    pub fn new(store: Arc<dyn DatasetStore>) -> Self {
        Self { store }
    }

    /// Statistics for an already loaded table
    pub fn summarize(table: &Table) -> AnalysisResult {
        let mut columns = Vec::with_capacity(table.headers.len());
        let mut numeric = BTreeMap::new();

        for (index, name) in table.headers.iter().enumerate() {
            let dtype = table.dtype(index);
            let column = ColumnInfo {
                name: name.clone(),
                dtype: dtype.to_string(),
            };
            if column.is_numeric() {
                let values: Vec<f64> = table.column(index).filter_map(parse_number).collect();
                numeric.insert(name.clone(), numeric_stats(&values));
            }
            columns.push(column);
        }

        AnalysisResult {
            row_count: table.rows.len(),
            columns,
            numeric_stats: numeric,
        }
    }
}

impl DatasetAnalyzer for CsvAnalyzer {
    fn analyze(&self, dataset_id: &str, read: &ReadOptions) -> Result<AnalysisResult> {
        let table = Table::load(self.store.as_ref(), dataset_id, read)?;
        let result = Self::summarize(&table);
        debug!(
            dataset_id,
            rows = result.row_count,
            columns = result.columns.len(),
            "Analyzed dataset"
        );
        Ok(result)
    }

    fn sample_rows(
        &self,
        dataset_id: &str,
        read: &ReadOptions,
        limit: usize,
    ) -> Result<Vec<SampleRow>> {
        let table = Table::load(self.store.as_ref(), dataset_id, read)?;
        let numeric: Vec<bool> = (0..table.headers.len())
            .map(|i| matches!(table.dtype(i), "int64" | "float64"))
            .collect();

        let rows = table
            .rows
            .iter()
            .take(limit)
            .map(|row| {
                let mut map = SampleRow::new();
                for (i, header) in table.headers.iter().enumerate() {
                    let raw = row.get(i).map(String::as_str).unwrap_or("");
                    let value = if is_missing(raw) {
                        Value::Null
                    } else if numeric[i] {
                        parse_number(raw)
                            .and_then(serde_json::Number::from_f64)
                            .map(Value::Number)
                            .unwrap_or(Value::Null)
                    } else {
                        Value::String(raw.to_string())
                    };
                    map.insert(header.clone(), value);
                }
                map
            })
            .collect();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalDatasetStore;
    use tempfile::TempDir;

    #[test]
    fn test_infer_dtype() {
        assert_eq!(infer_dtype(["1", "2", "3"].into_iter()), "int64");
        assert_eq!(infer_dtype(["1", "", "3"].into_iter()), "float64");
        assert_eq!(infer_dtype(["1.5", "2"].into_iter()), "float64");
        assert_eq!(infer_dtype(["", "NA"].into_iter()), "float64");
        assert_eq!(infer_dtype(["true", "False"].into_iter()), "bool");
        assert_eq!(infer_dtype(["true", ""].into_iter()), "object");
        assert_eq!(infer_dtype(["Paris", "1"].into_iter()), "object");
    }

    #[test]
    fn test_numeric_stats() {
        let stats = numeric_stats(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.count, Some(4.0));
        assert_eq!(stats.mean, Some(2.5));
        assert_eq!(stats.median, Some(2.5));
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(4.0));
        let std = stats.std.unwrap();
        assert!((std - 1.2909944).abs() < 1e-6);
    }

    #[test]
    fn test_numeric_stats_single_and_empty() {
        let single = numeric_stats(&[7.0]);
        assert_eq!(single.std, None);
        assert_eq!(single.median, Some(7.0));

        let empty = numeric_stats(&[]);
        assert_eq!(empty.count, Some(0.0));
        assert!(empty.mean.is_none());
    }

    #[test]
    fn test_table_parse_dedupes_headers_and_skips_blank_lines() {
        let table = Table::parse("a,a,b\n1,2,3\n,,\n4,5,6\n", b',').unwrap();
        assert_eq!(table.headers, vec!["a", "a.1", "b"]);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_table_parse_errors() {
        assert_eq!(Table::parse("", b',').unwrap_err().kind(), "parse_error");
        assert_eq!(
            Table::parse("a,b\n1,2,3\n", b',').unwrap_err().kind(),
            "parse_error"
        );
    }

    #[test]
    fn test_analyze_and_sample() {
        let dir = TempDir::new().unwrap();
        let store = LocalDatasetStore::new(dir.path());
        let read = ReadOptions::default();
        let receipt = store
            .upload_csv("city,sales,active\nParis,10,true\nLyon,5.5,false\nNice,,true\n", &read)
            .unwrap();

        let analyzer = CsvAnalyzer::new(Arc::new(store));
        let result = analyzer.analyze(&receipt.file_id, &read).unwrap();
        assert_eq!(result.row_count, 3);
        assert_eq!(result.columns[0].dtype, "object");
        assert_eq!(result.columns[1].dtype, "float64");
        assert_eq!(result.columns[2].dtype, "bool");
        assert_eq!(result.numeric_stats.len(), 1);
        assert_eq!(result.numeric_stats["sales"].count, Some(2.0));

        let rows = analyzer.sample_rows(&receipt.file_id, &read, 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["city"], "Paris");
        assert_eq!(rows[1]["sales"], 5.5);
    }

    #[test]
    fn test_analyze_missing_dataset() {
        let dir = TempDir::new().unwrap();
        let analyzer = CsvAnalyzer::new(Arc::new(LocalDatasetStore::new(dir.path())));
        let err = analyzer
            .analyze("missing", &ReadOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_semicolon_delimiter() {
        let table = Table::parse("a;b\n1;2\n", b';').unwrap();
        let result = CsvAnalyzer::summarize(&table);
        assert_eq!(result.columns.len(), 2);
        assert_eq!(result.columns[1].dtype, "int64");
    }
}
