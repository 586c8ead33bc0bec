//! Error types for Datasight

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to read dataset: {0}")]
    Parse(String),

    #[error("Chart error: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Stable machine-readable kind, used in error artifacts and tool responses
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io_error",
            Error::Csv(_) | Error::Parse(_) | Error::Excel(_) => "parse_error",
            Error::Http(_) => "http_error",
            Error::Json(_) => "json_error",
            Error::Toml(_) | Error::Config(_) => "configuration_error",
            Error::InvalidData(_) => "invalid_input",
            Error::NotFound(_) => "not_found",
            Error::Render(_) => "render_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::NotFound("x".into()).kind(), "not_found");
        assert_eq!(Error::Parse("x".into()).kind(), "parse_error");
        assert_eq!(Error::Config("x".into()).kind(), "configuration_error");
        assert_eq!(Error::Render("x".into()).kind(), "render_error");
    }

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("File not found for file_id=abc".into());
        assert_eq!(err.to_string(), "Not found: File not found for file_id=abc");
    }
}
