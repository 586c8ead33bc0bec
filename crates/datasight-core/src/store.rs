//! Dataset storage
//!
//! Uploaded datasets are persisted as `{data_dir}/{file_id}.csv`. Excel
//! uploads are converted to CSV on the way in so every downstream
//! collaborator only ever reads CSV.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration as ChronoDuration, NaiveDate};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{ReadOptions, TextEncoding, UploadReceipt};

/// Resolves dataset identifiers to files
pub trait DatasetStore: Send + Sync {
    /// Path of the stored dataset, or `NotFound`
    fn resolve(&self, dataset_id: &str) -> Result<PathBuf>;

    /// Raw bytes of the stored dataset
    fn read_bytes(&self, dataset_id: &str) -> Result<Vec<u8>> {
        let path = self.resolve(dataset_id)?;
        Ok(fs::read(path)?)
    }
}

/// Reject identifiers that could escape the data directory
pub fn validate_file_id(file_id: &str) -> Result<()> {
    let trimmed = file_id.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidData("file_id is required".into()));
    }
    if trimmed.contains('/') || trimmed.contains('\\') || trimmed.contains("..") {
        return Err(Error::InvalidData(format!("Invalid file_id '{}'", file_id)));
    }
    Ok(())
}

/// Normalize line endings to `\n` and ensure a trailing newline
pub fn normalize_newlines(data: &str) -> String {
    let mut normalized = data.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

/// Dataset store backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalDatasetStore {
    data_dir: PathBuf,
}

impl LocalDatasetStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, file_id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", file_id))
    }

    /// Persist CSV text and return its receipt
    pub fn upload_csv(&self, data: &str, read: &ReadOptions) -> Result<UploadReceipt> {
        if data.trim().is_empty() {
            return Err(Error::InvalidData("CSV data is empty".into()));
        }

        let normalized = normalize_newlines(data);
        let bytes = read.encoding.encode(&normalized)?;
        let receipt = self.write_dataset(&bytes, read, None)?;

        info!(
            file_id = %receipt.file_id,
            size_bytes = receipt.size_bytes,
            "Saved CSV dataset"
        );
        Ok(receipt)
    }

    /// Decode a base64 workbook, convert one sheet to CSV and persist it
    ///
    /// Uses the first sheet unless `sheet` names another one.
    pub fn upload_excel(&self, data_base64: &str, sheet: Option<&str>) -> Result<UploadReceipt> {
        let cleaned: String = data_base64.split_whitespace().collect();
        if cleaned.is_empty() {
            return Err(Error::InvalidData("Excel data is empty".into()));
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(cleaned.as_bytes())
            .map_err(|e| Error::InvalidData(format!("Invalid base64 data: {}", e)))?;

        let (sheet_name, csv_text) = workbook_to_csv(bytes, sheet)?;
        let csv_text = normalize_newlines(&csv_text);
        let read = ReadOptions::default();
        let receipt = self.write_dataset(csv_text.as_bytes(), &read, Some(sheet_name))?;

        info!(
            file_id = %receipt.file_id,
            sheet = receipt.sheet.as_deref().unwrap_or(""),
            size_bytes = receipt.size_bytes,
            "Saved Excel dataset as CSV"
        );
        Ok(receipt)
    }

    fn write_dataset(
        &self,
        bytes: &[u8],
        read: &ReadOptions,
        sheet: Option<String>,
    ) -> Result<UploadReceipt> {
        fs::create_dir_all(&self.data_dir)?;

        let file_id = uuid::Uuid::new_v4().simple().to_string();
        let path = self.path_for(&file_id);

        let mut content = Vec::with_capacity(bytes.len() + 3);
        if read.encoding == TextEncoding::Utf8Sig {
            content.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
        }
        content.extend_from_slice(bytes);
        fs::write(&path, &content)?;

        Ok(UploadReceipt {
            status: "saved".to_string(),
            file_id,
            path,
            size_bytes: content.len() as u64,
            delimiter: read.delimiter_str(),
            encoding: read.encoding.as_str().to_string(),
            sheet,
        })
    }
}

impl DatasetStore for LocalDatasetStore {
    fn resolve(&self, dataset_id: &str) -> Result<PathBuf> {
        validate_file_id(dataset_id)?;
        let path = self.path_for(dataset_id.trim());
        if !path.is_file() {
            debug!(dataset_id, path = %path.display(), "Dataset lookup missed");
            return Err(Error::NotFound(format!(
                "File not found for file_id={}",
                dataset_id
            )));
        }
        Ok(path)
    }
}

/// Convert the chosen sheet of a workbook to CSV text
fn workbook_to_csv(bytes: Vec<u8>, sheet: Option<&str>) -> Result<(String, String)> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| Error::Excel(format!("Failed to open workbook: {}", e)))?;

    let names = workbook.sheet_names();
    let sheet_name = match sheet.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => names
            .iter()
            .find(|n| n.as_str() == name)
            .cloned()
            .ok_or_else(|| {
                Error::NotFound(format!("Sheet '{}' not found. Available: {:?}", name, names))
            })?,
        None => names
            .first()
            .cloned()
            .ok_or_else(|| Error::Excel("Workbook has no sheets".into()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| Error::Excel(format!("Failed to read sheet '{}': {}", sheet_name, e)))?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in range.rows() {
        let record: Vec<String> = row.iter().map(cell_to_string).collect();
        writer.write_record(&record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Excel(format!("Failed to write CSV: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| Error::Excel(format!("Sheet produced invalid text: {}", e)))?;

    if text.trim().is_empty() {
        return Err(Error::InvalidData(format!("Sheet '{}' is empty", sheet_name)));
    }
    Ok((sheet_name, text))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                n.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_string(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#{:?}", e),
    }
}

/// Render an Excel serial date (1900 system) as ISO text
fn excel_serial_to_string(serial: f64) -> String {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).map(|d| d.and_hms_opt(0, 0, 0));
    let Some(Some(epoch)) = epoch else {
        return serial.to_string();
    };
    let millis = (serial * 86_400_000.0).round() as i64;
    let when = epoch + ChronoDuration::milliseconds(millis);
    if serial.fract().abs() < 1e-9 {
        when.format("%Y-%m-%d").to_string()
    } else {
        when.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, LocalDatasetStore) {
        let dir = TempDir::new().unwrap();
        let store = LocalDatasetStore::new(dir.path().join("data"));
        (dir, store)
    }

    #[test]
    fn test_upload_normalizes_newlines() {
        let (_dir, store) = store();
        let receipt = store
            .upload_csv("a,b\r\n1,2\r3,4", &ReadOptions::default())
            .unwrap();

        assert_eq!(receipt.status, "saved");
        assert_eq!(receipt.file_id.len(), 32);
        let content = fs::read_to_string(&receipt.path).unwrap();
        assert_eq!(content, "a,b\n1,2\n3,4\n");
        assert_eq!(receipt.size_bytes, content.len() as u64);
    }

    #[test]
    fn test_upload_rejects_empty() {
        let (_dir, store) = store();
        let err = store.upload_csv("  \n", &ReadOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_upload_latin1_and_bom() {
        let (_dir, store) = store();
        let latin = ReadOptions::parse(",", "latin-1").unwrap();
        let receipt = store.upload_csv("name\ncafé\n", &latin).unwrap();
        let bytes = fs::read(&receipt.path).unwrap();
        assert!(bytes.contains(&0xE9));
        assert_eq!(receipt.encoding, "latin-1");

        let sig = ReadOptions::parse(",", "utf-8-sig").unwrap();
        let receipt = store.upload_csv("a\n1\n", &sig).unwrap();
        let bytes = fs::read(&receipt.path).unwrap();
        assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
    }

    #[test]
    fn test_resolve() {
        let (_dir, store) = store();
        let receipt = store.upload_csv("a\n1\n", &ReadOptions::default()).unwrap();
        assert_eq!(store.resolve(&receipt.file_id).unwrap(), receipt.path);

        let err = store.resolve("doesnotexist").unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_validate_file_id() {
        assert!(validate_file_id("abc123").is_ok());
        assert!(validate_file_id("").is_err());
        assert!(validate_file_id("../etc/passwd").is_err());
        assert!(validate_file_id("a/b").is_err());
        assert!(validate_file_id("a\\b").is_err());
    }

    #[test]
    fn test_upload_excel_rejects_bad_input() {
        let (_dir, store) = store();
        assert_eq!(store.upload_excel("", None).unwrap_err().kind(), "invalid_input");
        assert_eq!(
            store.upload_excel("not base64!!", None).unwrap_err().kind(),
            "invalid_input"
        );

        // Valid base64, but not a workbook
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"plain text");
        assert_eq!(store.upload_excel(&encoded, None).unwrap_err().kind(), "parse_error");
    }

    #[test]
    fn test_excel_serial_dates() {
        assert_eq!(excel_serial_to_string(45292.0), "2024-01-01");
        assert_eq!(excel_serial_to_string(45292.5), "2024-01-01 12:00:00");
    }

    #[test]
    fn test_cell_formatting() {
        assert_eq!(cell_to_string(&Data::Float(3.0)), "3");
        assert_eq!(cell_to_string(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String("x".into())), "x");
    }
}
