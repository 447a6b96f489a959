use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use jsonschema::validator_for;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::util::env_string;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_MIN_LEVEL: &str = "DEBUG";
const LOG_LEVEL_NAMES: [&str; 4] = ["DEBUG", "INFO", "WARN", "ERROR"];

#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL of the SQL Runner backend, e.g. <http://127.0.0.1:8000>
    #[serde(default)]
    pub base_url: Option<String>,
    /// Transport timeout for a single request (seconds)
    #[serde(default)]
    #[schemars(range(min = 1, max = 600))]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding durable client state (query history).
    #[serde(default)]
    pub dir: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Environment tag stamped on every log entry ("development", "production", ...)
    #[serde(default)]
    pub environment: Option<String>,
    /// Lowest level forwarded to sinks: DEBUG, INFO, WARN or ERROR
    #[serde(default)]
    pub min_level: Option<String>,
    /// Client identification stamped on log entries
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Fully resolved settings the console starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub timeout: Duration,
    pub storage_dir: PathBuf,
    pub environment: String,
    pub min_level: String,
    pub user_agent: String,
}

/// Returns the JSON schema describing the configuration structure.
pub fn config_schema_json() -> Result<serde_json::Value> {
    let schema = schemars::schema_for!(Config);
    serde_json::to_value(&schema).context("serializing config schema")
}

/// Parse and validate a TOML config document.
pub fn parse_config(content: &str) -> Result<Config> {
    let raw: toml::Value = toml::from_str(content).context("parsing config toml")?;
    let json_value = serde_json::to_value(&raw)?;
    let schema = config_schema_json()?;
    let validator =
        validator_for(&schema).map_err(|e| anyhow!("invalid config schema: {e}"))?;
    let validation_errors: Vec<_> = validator
        .iter_errors(&json_value)
        .map(|e| e.to_string())
        .collect();
    if !validation_errors.is_empty() {
        bail!(validation_errors.join(", "));
    }
    let cfg: Config = toml::from_str(content).context("decoding config")?;
    cfg.check_values()?;
    Ok(cfg)
}

pub fn load_config(path: &str) -> Result<Config> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading config at {path}"))?;
    parse_config(&content).with_context(|| format!("loading config at {path}"))
}

impl Config {
    fn check_values(&self) -> Result<()> {
        if self.api.timeout_secs == Some(0) {
            bail!("api.timeout_secs must be at least 1");
        }
        if let Some(level) = &self.telemetry.min_level {
            if !LOG_LEVEL_NAMES
                .iter()
                .any(|name| name.eq_ignore_ascii_case(level.trim()))
            {
                bail!("telemetry.min_level must be one of {}", LOG_LEVEL_NAMES.join(", "));
            }
        }
        Ok(())
    }

    /// Environment variables win over file values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = env_string("SQLRUN_API_URL") {
            self.api.base_url = Some(url);
        }
        if let Some(secs) = env_string("SQLRUN_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.api.timeout_secs = Some(secs);
        }
        if let Some(dir) = env_string("SQLRUN_STORAGE_DIR") {
            self.storage.dir = Some(dir);
        }
        if let Some(env) = env_string("SQLRUN_ENV") {
            self.telemetry.environment = Some(env);
        }
        if let Some(level) = env_string("SQLRUN_LOG_LEVEL") {
            self.telemetry.min_level = Some(level);
        }
    }

    /// Fill defaults and check required values. The backend URL has no default.
    pub fn resolve(&self) -> Result<Settings> {
        let base_url = self
            .api
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                anyhow!("backend URL is not configured; set api.base_url or SQLRUN_API_URL")
            })?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            bail!("backend URL must use http or https: {base_url}");
        }
        let timeout_secs = self.api.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1);
        let storage_dir = self
            .storage
            .dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(default_storage_dir);
        Ok(Settings {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
            storage_dir,
            environment: self
                .telemetry
                .environment
                .clone()
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            min_level: self
                .telemetry
                .min_level
                .clone()
                .unwrap_or_else(|| DEFAULT_MIN_LEVEL.to_string()),
            user_agent: self
                .telemetry
                .user_agent
                .clone()
                .unwrap_or_else(|| format!("sqlrun/{}", env!("CARGO_PKG_VERSION"))),
        })
    }
}

/// Per-user data directory; falls back to `.sqlrun` in the working directory.
pub fn default_storage_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "sqlrun", "sqlrun")
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".sqlrun"))
}
