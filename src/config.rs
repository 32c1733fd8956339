//! Configuration
//!
//! Provides centralized configuration management with:
//! - Environment variable support
//! - Config file loading (optional)
//! - Runtime defaults
//! - Validation

use crate::cache::DEFAULT_TTL_SECONDS;
use crate::gateway::{Endpoints, DEFAULT_API_BASE, DEFAULT_REPORTS_BASE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub toggl: TogglConfig,
    pub cache: CacheConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TogglConfig {
    /// Workspace used when a tag gives no `workspace_id`.
    pub default_workspace_id: Option<String>,
    /// Token for standalone use; inside a wiki it comes from user preferences.
    pub api_token: Option<String>,
    /// Contact identity sent as user agent.
    pub user_agent: Option<String>,
    pub api_base_url: String,
    pub reports_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub log_directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "WARN".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

impl Default for TogglConfig {
    fn default() -> Self {
        Self {
            default_workspace_id: None,
            api_token: None,
            user_agent: None,
            api_base_url: DEFAULT_API_BASE.to_string(),
            reports_base_url: DEFAULT_REPORTS_BASE.to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from("logs"),
        }
    }
}

impl TogglConfig {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            api_base: self.api_base_url.clone(),
            reports_base: self.reports_base_url.clone(),
        }
    }
}

impl Config {
    /// Load configuration from environment, file, and defaults
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        let config_paths = [
            PathBuf::from("toggl-wiki.toml"),
            PathBuf::from(".toggl-wiki.toml"),
            dirs::config_dir()
                .map(|d| d.join("toggl-wiki").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.is_file() {
                info!(config_file = %path.display(), "Loading configuration from file");
                config = Self::load_from_file(path)?;
                break;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        if let Ok(val) = env::var("TOGGL_WORKSPACE_ID") {
            self.toggl.default_workspace_id = Some(val).filter(|v| !v.is_empty());
        }
        if let Ok(val) = env::var("TOGGL_API_TOKEN") {
            self.toggl.api_token = Some(val).filter(|v| !v.is_empty());
        }
        if let Ok(val) = env::var("TOGGL_USER_AGENT") {
            self.toggl.user_agent = Some(val).filter(|v| !v.is_empty());
        }
        if let Ok(val) = env::var("TOGGL_API_URL") {
            self.toggl.api_base_url = val;
        }
        if let Ok(val) = env::var("TOGGL_REPORTS_URL") {
            self.toggl.reports_base_url = val;
        }

        if let Ok(val) = env::var("TOGGL_CACHE_TTL_SECS") {
            self.cache.ttl_seconds = val.parse().context("Invalid TOGGL_CACHE_TTL_SECS")?;
        }

        if let Ok(val) = env::var("TOGGL_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("api_base_url", &self.toggl.api_base_url),
            ("reports_base_url", &self.toggl.reports_base_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(anyhow::anyhow!(
                    "{} must be an http(s) URL, got {:?}",
                    name,
                    url
                ));
            }
        }

        if self.cache.ttl_seconds > 86_400 {
            warn!(
                ttl_seconds = self.cache.ttl_seconds,
                "Cache TTL is longer than a day, reports may be stale"
            );
        }

        if !matches!(self.logging.output.as_str(), "console" | "file" | "both") {
            warn!(output = %self.logging.output, "Unknown log output, using console");
        }

        Ok(())
    }

    /// Save current configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(path = %path.display(), "Configuration saved to file");

        Ok(())
    }
}
