//! Application configuration
//!
//! Config is resolved once at process start and passed by value into the
//! insight client, dataset store and orchestrator. Nothing below this module
//! reads the environment.
//!
//! ## Resolution order
//!
//! 1. Embedded defaults (`config/datasight.toml`, compiled into the binary)
//! 2. Override file (`--config PATH`, else `~/.config/datasight/datasight.toml`)
//! 3. `DATASIGHT_*` environment variables

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/datasight.toml");

pub const ENV_BASE_URL: &str = "DATASIGHT_AI_BASE_URL";
pub const ENV_API_KEY: &str = "DATASIGHT_AI_API_KEY";
pub const ENV_MODEL: &str = "DATASIGHT_AI_MODEL";
pub const ENV_TIMEOUT: &str = "DATASIGHT_AI_TIMEOUT_SECS";
pub const ENV_MAX_RETRIES: &str = "DATASIGHT_AI_MAX_RETRIES";
pub const ENV_BACKOFF: &str = "DATASIGHT_AI_BACKOFF_SECS";
pub const ENV_DEBUG: &str = "DATASIGHT_AI_DEBUG";
pub const ENV_DATA_DIR: &str = "DATASIGHT_DATA_DIR";
pub const ENV_OUTPUT_DIR: &str = "DATASIGHT_OUTPUT_DIR";

/// Settings for the insight endpoint
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the OpenAI-compatible endpoint (no trailing slash)
    pub base_url: String,
    /// Bearer credential; `None` means the client is not configured
    pub api_key: Option<String>,
    /// Remote model identifier
    pub model: String,
    pub temperature: f32,
    /// Per-attempt network timeout
    pub timeout: Duration,
    /// Attempts after the first failure
    pub max_retries: u32,
    /// Multiplier for exponential backoff
    pub backoff_base: Duration,
    /// Persist the last raw response / error context
    pub debug_enabled: bool,
    /// Single-slot debug snapshot location
    pub debug_path: PathBuf,
    /// Dataset rows included in the prompt
    pub sample_rows: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maas-api.lanyun.net/v1".to_string(),
            api_key: None,
            model: "Kimi-K2-instruct".to_string(),
            temperature: 0.3,
            timeout: Duration::from_secs(20),
            max_retries: 2,
            backoff_base: Duration::from_secs(1),
            debug_enabled: false,
            debug_path: PathBuf::from("outputs").join("debug").join("insight_last.json"),
            sample_rows: 5,
        }
    }
}

impl ClientConfig {
    /// The retry policy for one insight call
    pub fn request_config(&self) -> RequestConfig {
        RequestConfig {
            timeout: self.timeout,
            max_retries: self.max_retries,
            backoff_base: self.backoff_base,
            debug_enabled: self.debug_enabled,
        }
    }

    /// Copy of this config pointed at another endpoint (tests, `--endpoint`)
    pub fn with_base_url(&self, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..self.clone()
        }
    }
}

/// Timeout/retry policy applied to a single InsightClient call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub debug_enabled: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        ClientConfig::default().request_config()
    }
}

/// Where datasets, charts and reports live on disk
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("outputs"),
        }
    }
}

impl StorageConfig {
    pub fn new(data_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.output_dir.clone()
    }

    pub fn interactive_dir(&self) -> PathBuf {
        self.output_dir.join("interactive")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.output_dir.join("reports")
    }

    pub fn debug_dir(&self) -> PathBuf {
        self.output_dir.join("debug")
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub ai: ClientConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Resolve config from defaults, the override file and the process environment
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        Self::load_with(override_path, |key| std::env::var(key).ok())
    }

    /// Resolve config with an explicit variable lookup (used by tests)
    pub fn load_with<F>(override_path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = parse_config(DEFAULT_CONFIG)?;

        let override_path = override_path
            .map(Path::to_path_buf)
            .or_else(|| default_config_path().filter(|p| p.exists()));
        if let Some(path) = override_path {
            let content = fs::read_to_string(&path).map_err(|e| {
                Error::Config(format!("Failed to read config {}: {}", path.display(), e))
            })?;
            let raw: RawConfig = toml::from_str(&content)?;
            apply_raw(&mut config, raw)?;
        }

        apply_env(&mut config, lookup)?;
        config.ai.debug_path = config.storage.debug_dir().join("insight_last.json");
        Ok(config)
    }

    /// API key masked for display
    pub fn masked_api_key(&self) -> String {
        let Some(key) = self.ai.api_key.as_deref() else {
            return "(not set)".to_string();
        };
        let count = key.chars().count();
        if count <= 8 {
            return "****".to_string();
        }
        let head: String = key.chars().take(4).collect();
        let tail: String = key.chars().skip(count - 2).collect();
        format!("{}****{}", head, tail)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("datasight").join("datasight.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    ai: Option<RawAi>,
    storage: Option<RawStorage>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAi {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<f64>,
    max_retries: Option<u32>,
    backoff_secs: Option<f64>,
    debug: Option<bool>,
    sample_rows: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStorage {
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

/// Parse config from TOML content on top of the built-in defaults
fn parse_config(content: &str) -> Result<AppConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    let mut config = AppConfig::default();
    apply_raw(&mut config, raw)?;
    Ok(config)
}

fn apply_raw(config: &mut AppConfig, raw: RawConfig) -> Result<()> {
    if let Some(ai) = raw.ai {
        if let Some(url) = ai.base_url {
            config.ai.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(key) = ai.api_key {
            config.ai.api_key = Some(key).filter(|k| !k.trim().is_empty());
        }
        if let Some(model) = ai.model {
            config.ai.model = model;
        }
        if let Some(temperature) = ai.temperature {
            config.ai.temperature = temperature;
        }
        if let Some(secs) = ai.timeout_secs {
            config.ai.timeout = positive_duration("ai.timeout_secs", secs)?;
        }
        if let Some(retries) = ai.max_retries {
            config.ai.max_retries = retries;
        }
        if let Some(secs) = ai.backoff_secs {
            config.ai.backoff_base = seconds("ai.backoff_secs", secs)?;
        }
        if let Some(debug) = ai.debug {
            config.ai.debug_enabled = debug;
        }
        if let Some(rows) = ai.sample_rows {
            config.ai.sample_rows = rows;
        }
    }

    if let Some(storage) = raw.storage {
        if let Some(dir) = storage.data_dir {
            config.storage.data_dir = dir;
        }
        if let Some(dir) = storage.output_dir {
            config.storage.output_dir = dir;
        }
    }
    Ok(())
}

fn apply_env<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(url) = get(ENV_BASE_URL) {
        config.ai.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(key) = get(ENV_API_KEY) {
        config.ai.api_key = Some(key);
    }
    if let Some(model) = get(ENV_MODEL) {
        config.ai.model = model;
    }
    if let Some(raw) = get(ENV_TIMEOUT) {
        config.ai.timeout = positive_duration(ENV_TIMEOUT, parse_secs(ENV_TIMEOUT, &raw)?)?;
    }
    if let Some(raw) = get(ENV_MAX_RETRIES) {
        config.ai.max_retries = raw.parse().map_err(|_| {
            Error::Config(format!("{} must be a non-negative integer, got '{}'", ENV_MAX_RETRIES, raw))
        })?;
    }
    if let Some(raw) = get(ENV_BACKOFF) {
        config.ai.backoff_base = seconds(ENV_BACKOFF, parse_secs(ENV_BACKOFF, &raw)?)?;
    }
    if let Some(raw) = get(ENV_DEBUG) {
        config.ai.debug_enabled = parse_flag(ENV_DEBUG, &raw)?;
    }
    if let Some(dir) = get(ENV_DATA_DIR) {
        config.storage.data_dir = PathBuf::from(dir);
    }
    if let Some(dir) = get(ENV_OUTPUT_DIR) {
        config.storage.output_dir = PathBuf::from(dir);
    }
    Ok(())
}

fn parse_secs(key: &str, raw: &str) -> Result<f64> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(Error::Config(format!(
            "{} must be a non-negative number of seconds, got '{}'",
            key, raw
        ))),
    }
}

/// Non-negative seconds that fit in a `Duration`
fn seconds(key: &str, secs: f64) -> Result<Duration> {
    if secs.is_nan() || secs < 0.0 {
        return Err(Error::Config(format!(
            "{} must be a non-negative number of seconds, got {}",
            key, secs
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| Error::Config(format!("{} is out of range ({}): {}", key, secs, e)))
}

fn positive_duration(key: &str, secs: f64) -> Result<Duration> {
    let duration = seconds(key, secs)?;
    if duration.is_zero() {
        return Err(Error::Config(format!("{} must be positive", key)));
    }
    Ok(duration)
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{} must be a boolean, got '{}'", key, raw))),
    }
}
