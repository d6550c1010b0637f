use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SyncError;

pub const CONFIG_ENV_VAR: &str = "DEVOPS_NOTION_SYNC_CONFIG";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub azure: AzureConfig,
    pub notion: NotionConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct AzureConfig {
    /// Organization root, e.g. `https://dev.azure.com/myorg/`. Used both as
    /// the API base and as the prefix of work item deep links.
    pub organization: String,
    pub personal_access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct NotionConfig {
    pub token: String,
    pub database_id: String,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_level() -> String {
    "info".into()
}

impl AppConfig {
    /// Reject empty credentials and malformed values before any remote call
    /// is made, and normalize the organization URL to a single trailing slash.
    pub fn validate(mut self) -> Result<Self, SyncError> {
        let required = [
            ("azure.organization", &self.azure.organization),
            ("azure.personal_access_token", &self.azure.personal_access_token),
            ("notion.token", &self.notion.token),
            ("notion.database_id", &self.notion.database_id),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(SyncError::Config(format!("`{key}` must not be empty")));
            }
        }

        let org = self.azure.organization.trim();
        if !(org.starts_with("https://") || org.starts_with("http://")) {
            return Err(SyncError::Config(format!(
                "`azure.organization` must be an http(s) URL, got `{org}`"
            )));
        }
        self.azure.organization = format!("{}/", org.trim_end_matches('/'));

        if self.http.timeout_secs == 0 {
            return Err(SyncError::Config(
                "`http.timeout_secs` must be greater than zero".into(),
            ));
        }

        self.logging.level = self.logging.level.trim().to_lowercase();
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(SyncError::Config(format!(
                "`logging.level` must be one of trace, debug, info, warn, error; got `{}`",
                self.logging.level
            )));
        }

        Ok(self)
    }

    pub fn log_level(&self) -> tracing::Level {
        self.logging.level.parse().unwrap_or(tracing::Level::INFO)
    }
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".devops-notion-sync")
}

/// Env override first, then `./config.toml`, then the per-user data dir.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return PathBuf::from(path);
    }
    let local = PathBuf::from("config.toml");
    if local.exists() {
        return local;
    }
    data_dir().join("config.toml")
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(SyncError::Config(format!(
            "no config file at {} (set {CONFIG_ENV_VAR} to override)",
            path.display()
        ))
        .into());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .map_err(|e| SyncError::Config(e.to_string()))
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config.validate()?)
}
