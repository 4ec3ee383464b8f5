//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (MARKET_SW_*)
//! 2. TOML config file (if MARKET_SW_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The partition registry defaults to the compile-time constants in
//! [`crate::registry`]; overriding it is mostly useful for tests and for
//! forcing a cache bust without a rebuild.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::location::parse_origin;
use crate::registry::PartitionRegistry;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (MARKET_SW_*)
/// 2. TOML config file (if MARKET_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite file backing the partition store.
    ///
    /// Set via MARKET_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the dashboard is served from.
    ///
    /// Root-relative asset paths resolve against it, and responses from it
    /// count as same-origin. Set via MARKET_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via MARKET_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via MARKET_SW_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via MARKET_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Partition names and the Static Asset List.
    ///
    /// Nested keys use a double underscore, e.g. MARKET_SW_REGISTRY__PARTITIONS__DATA.
    #[serde(default)]
    pub registry: PartitionRegistry,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./market-sw-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8000".into()
}

fn default_user_agent() -> String {
    "market-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            registry: PartitionRegistry::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The parsed origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        parse_origin(&self.origin).map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `MARKET_SW_`
    /// 2. TOML file from `MARKET_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("MARKET_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("MARKET_SW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(&figment)
    }

    /// Extract and validate from an already assembled figment.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DATA_PARTITION, STATIC_ASSETS};

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./market-sw-cache.sqlite"));
        assert_eq!(config.origin, "http://localhost:8000");
        assert_eq!(config.user_agent, "market-sw/0.1");
        assert_eq!(config.max_bytes, 10_485_760);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.registry.partitions.data, DATA_PARTITION);
        assert_eq!(config.registry.static_assets.len(), STATIC_ASSETS.len());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_origin_url() {
        let config = AppConfig::default();
        assert_eq!(config.origin_url().unwrap().as_str(), "http://localhost:8000/");

        let config = AppConfig { origin: "localhost".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_toml_overrides_registry() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string(
            r#"
            origin = "https://dashboard.example"

            [registry]
            static_assets = ["/", "/market.html"]

            [registry.partitions]
            data = "market-data-v2.0.0"
            "#,
        ));

        let config = AppConfig::from_figment(&figment).unwrap();
        assert_eq!(config.origin, "https://dashboard.example");
        assert_eq!(config.registry.partitions.data, "market-data-v2.0.0");
        assert_eq!(config.registry.partitions.generic, "market-dashboard-v1.1.0");
        assert_eq!(config.registry.static_assets, vec!["/".to_string(), "/market.html".to_string()]);
    }

    #[test]
    fn test_invalid_toml_value_fails_validation() {
        let figment =
            Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string("timeout_ms = 10"));
        let result = AppConfig::from_figment(&figment);
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }
}
