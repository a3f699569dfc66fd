//! Application configuration.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use skindex_engine::EngineConfig;
use skindex_market::{ProviderConfig, RateLimitConfig, RetryPolicy};
use skindex_registry::PrebuiltConfig;
use std::path::{Path, PathBuf};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "SKINDEX_CONFIG";

/// Environment variable overriding `provider.api_key`.
pub const API_KEY_ENV: &str = "SKINDEX_API_KEY";

/// Valuation schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between valuation passes. Default: 900 (15 minutes).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Seconds between catalog refreshes (sync + prebuilt regeneration).
    /// 0 disables periodic refresh. Default: 86,400 (daily).
    #[serde(default = "default_catalog_refresh_secs")]
    pub catalog_refresh_secs: u64,
}

fn default_interval_secs() -> u64 {
    900
}

fn default_catalog_refresh_secs() -> u64 {
    86_400
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            catalog_refresh_secs: default_catalog_refresh_secs(),
        }
    }
}

/// Record store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for the price point journal and index snapshot.
    /// Defaults to `data`; an empty string keeps everything in memory.
    #[serde(default = "default_data_dir")]
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Effective data directory, `None` when persistence is disabled.
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir
            .as_deref()
            .filter(|dir| !dir.as_os_str().is_empty())
    }
}

fn default_data_dir() -> Option<PathBuf> {
    Some(PathBuf::from("data"))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is unset (e.g. "info,skindex=debug").
    #[serde(default)]
    pub log_filter: Option<String>,
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub prebuilt: PrebuiltConfig,
}

impl AppConfig {
    /// Resolve the configuration path: explicit > `SKINDEX_CONFIG` > default.
    pub fn resolve_path(explicit: Option<&str>) -> PathBuf {
        explicit
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
            .into()
    }

    /// Load from `path`, falling back to defaults when the file is missing,
    /// then apply environment overrides and validate.
    pub fn load(path: &Path) -> AppResult<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file without overrides or validation.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// `SKINDEX_API_KEY` replaces the configured provider key.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.provider.api_key = Some(key.trim().to_string());
            }
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        let fail = |msg: String| -> AppResult<()> { Err(AppError::Config(msg)) };

        if self.provider.base_url.trim().is_empty() {
            return fail("provider.base_url must be set".into());
        }
        if self.provider.page_size == 0 {
            return fail("provider.page_size must be at least 1".into());
        }
        if self.provider.timeout_ms == 0 {
            return fail("provider.timeout_ms must be positive".into());
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window_ms == 0 {
            return fail("rate_limit.max_requests and rate_limit.window_ms must be positive".into());
        }
        if self.retry.max_attempts == 0 {
            return fail("retry.max_attempts must be at least 1".into());
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return fail(format!(
                "retry.base_delay_ms ({}) must not exceed retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            ));
        }
        self.engine
            .validate()
            .map_err(|e| AppError::Config(format!("engine: {e}")))?;
        if self.scheduler.interval_secs == 0 {
            return fail("scheduler.interval_secs must be positive".into());
        }

        for rule in &self.prebuilt.rules {
            if rule.name.trim().is_empty() {
                return fail("prebuilt rule names must not be empty".into());
            }
            if rule.markets.as_ref().is_some_and(|m| m.is_empty()) {
                return fail(format!(
                    "prebuilt rule '{}' has an empty market list; omit it to use every market",
                    rule.name
                ));
            }
        }
        Ok(())
    }
}
