use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use qarag_core::ingestion::IngestionTimings;
use qarag_core::models::DEFAULT_PRECISE_THRESHOLD;

/// Environment variable that overrides `backend.base_url`.
pub const BACKEND_URL_ENV: &str = "QARAG_BACKEND_URL";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestionConfig {
    #[serde(default = "default_parsing_after_ms")]
    pub parsing_after_ms: u64,
    #[serde(default = "default_embedding_after_ms")]
    pub embedding_after_ms: u64,
    #[serde(default = "default_complete_hold_ms")]
    pub complete_hold_ms: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            parsing_after_ms: default_parsing_after_ms(),
            embedding_after_ms: default_embedding_after_ms(),
            complete_hold_ms: default_complete_hold_ms(),
        }
    }
}

fn default_parsing_after_ms() -> u64 {
    2000
}
fn default_embedding_after_ms() -> u64 {
    5000
}
fn default_complete_hold_ms() -> u64 {
    2000
}

impl IngestionConfig {
    pub fn timings(&self) -> IngestionTimings {
        IngestionTimings {
            parsing_after: Duration::from_millis(self.parsing_after_ms),
            embedding_after: Duration::from_millis(self.embedding_after_ms),
            complete_hold: Duration::from_millis(self.complete_hold_ms),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_narrow_columns")]
    pub narrow_columns: u16,
    #[serde(default = "default_precise_threshold")]
    pub precise_threshold: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            narrow_columns: default_narrow_columns(),
            precise_threshold: default_precise_threshold(),
        }
    }
}

fn default_narrow_columns() -> u16 {
    100
}
fn default_precise_threshold() -> f64 {
    DEFAULT_PRECISE_THRESHOLD
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.backend.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!(
                "backend.base_url must start with http:// or https:// (got '{}')",
                url
            );
        }

        if self.backend.timeout_secs == 0 {
            anyhow::bail!("backend.timeout_secs must be > 0");
        }

        if self.ingestion.embedding_after_ms < self.ingestion.parsing_after_ms {
            anyhow::bail!("ingestion.embedding_after_ms must be >= ingestion.parsing_after_ms");
        }

        if !(0.0..=100.0).contains(&self.display.precise_threshold) {
            anyhow::bail!("display.precise_threshold must be in [0.0, 100.0]");
        }

        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                self.backend.base_url = url.trim().to_string();
            }
        }
    }
}

/// Parse a config from TOML text and validate it.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load the config at `path`, falling back to [`Config::minimal`] when the
/// file does not exist. `QARAG_BACKEND_URL` is applied last.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::minimal()
    };

    config.apply_env();
    config.validate()?;
    Ok(config)
}
