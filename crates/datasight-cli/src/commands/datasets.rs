//! Dataset commands (upload, analyze)

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use base64::Engine;

use datasight_core::tools::{self, AnalyzeParams, ToolContext, UploadCsvParams, UploadExcelParams};
use datasight_core::{ReadOptions, UploadReceipt};

use super::print_json;
use crate::cli::ReadArgs;

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Whether a path looks like a spreadsheet workbook
pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| WORKBOOK_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Store a CSV file or one sheet of a workbook
pub fn upload_file(
    ctx: &ToolContext,
    file: &Path,
    sheet: Option<&str>,
    read: &ReadArgs,
) -> Result<UploadReceipt> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    if is_workbook(file) {
        let params = UploadExcelParams {
            data_base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
            sheet: sheet.map(str::to_string),
        };
        return tools::upload_excel(ctx, params)
            .with_context(|| format!("Failed to upload workbook {}", file.display()));
    }

    let options = ReadOptions::parse(&read.delimiter, &read.encoding)?;
    let data = options
        .encoding
        .decode(&bytes)
        .with_context(|| format!("Failed to decode {} as {}", file.display(), read.encoding))?;
    let params = UploadCsvParams {
        data,
        delimiter: read.delimiter.clone(),
        encoding: read.encoding.clone(),
    };
    tools::upload_csv(ctx, params).with_context(|| format!("Failed to upload {}", file.display()))
}

pub fn cmd_upload(
    ctx: &ToolContext,
    file: &Path,
    sheet: Option<&str>,
    read: &ReadArgs,
) -> Result<()> {
    let receipt = upload_file(ctx, file, sheet, read)?;
    print_json(&receipt)
}

pub fn cmd_analyze(ctx: &ToolContext, file_id: &str, read: &ReadArgs) -> Result<()> {
    let params = AnalyzeParams {
        file_id: file_id.to_string(),
        delimiter: read.delimiter.clone(),
        encoding: read.encoding.clone(),
    };
    let result = tools::analyze_summary(ctx, params)
        .with_context(|| format!("Failed to analyze dataset {}", file_id))?;
    print_json(&result)
}
