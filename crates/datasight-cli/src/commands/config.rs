//! Config command

use anyhow::Result;

use datasight_core::AppConfig;

/// Resolved configuration as display lines, API key masked
pub fn config_lines(config: &AppConfig) -> Vec<(&'static str, String)> {
    let ai = &config.ai;
    vec![
        ("ai.base_url", ai.base_url.clone()),
        ("ai.api_key", config.masked_api_key()),
        ("ai.model", ai.model.clone()),
        ("ai.temperature", ai.temperature.to_string()),
        ("ai.timeout_secs", format!("{}", ai.timeout.as_secs_f64())),
        ("ai.max_retries", ai.max_retries.to_string()),
        ("ai.backoff_secs", format!("{}", ai.backoff_base.as_secs_f64())),
        ("ai.debug", ai.debug_enabled.to_string()),
        ("ai.debug_path", ai.debug_path.display().to_string()),
        ("ai.sample_rows", ai.sample_rows.to_string()),
        ("storage.data_dir", config.storage.data_dir.display().to_string()),
        ("storage.output_dir", config.storage.output_dir.display().to_string()),
    ]
}

pub fn cmd_config(config: &AppConfig) -> Result<()> {
    for (key, value) in config_lines(config) {
        println!("{:<20} {}", key, value);
    }
    Ok(())
}
