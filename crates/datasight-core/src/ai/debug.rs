//! Single-slot debug snapshot of the last insight call

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Longest response body kept in a snapshot
const MAX_BODY_EXCERPT: usize = 2000;

/// Raw context of the most recent insight call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugSnapshot {
    pub recorded_at: DateTime<Utc>,
    pub endpoint: String,
    pub model: String,
    pub attempts: u32,
    /// `success` or `error`
    pub outcome: String,
    pub status: Option<u16>,
    pub body_excerpt: Option<String>,
    pub error: Option<String>,
}

impl DebugSnapshot {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            recorded_at: Utc::now(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            attempts: 0,
            outcome: "error".to_string(),
            status: None,
            body_excerpt: None,
            error: None,
        }
    }

    pub fn with_body(mut self, status: u16, body: &str) -> Self {
        self.status = Some(status);
        self.body_excerpt = Some(body.chars().take(MAX_BODY_EXCERPT).collect());
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == "success"
    }

    /// Replace the snapshot at `path`
    ///
    /// Written to a sibling temp file and renamed, so readers never observe
    /// a partial document.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, self)?;
        tmp.write_all(b"\n")?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
