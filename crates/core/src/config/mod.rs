//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CANEMAP_*)
//! 2. TOML config file (if CANEMAP_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The defaults reproduce the deployed CaneMap offline contract: the
//! `canemap-offline-v2` generation, the eight essential Worker/Driver pages
//! and their shared dependency scripts, and the area markers used for
//! request classification.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::gate::GateConfig;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CANEMAP_*)
/// 2. TOML config file (if CANEMAP_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the gateway listens on.
    ///
    /// Set via CANEMAP_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Origin the gateway fronts, scheme and host only.
    ///
    /// Set via CANEMAP_UPSTREAM_ORIGIN environment variable.
    #[serde(default = "default_upstream_origin")]
    pub upstream_origin: String,

    /// Path to the SQLite cache database.
    ///
    /// Set via CANEMAP_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for upstream requests.
    ///
    /// Set via CANEMAP_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via CANEMAP_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Name of the current cache generation.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Pages and scripts warmed into the cache at install time.
    #[serde(default = "default_offline_pages")]
    pub offline_pages: Vec<String>,

    /// Marker whose presence anywhere in a path (case-insensitive) excludes
    /// the request from interception entirely.
    #[serde(default = "default_excluded_marker")]
    pub excluded_marker: String,

    /// Path segments that opt a GET request into the managed strategy.
    #[serde(default = "default_managed_markers")]
    pub managed_markers: Vec<String>,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8787".into()
}

fn default_upstream_origin() -> String {
    "https://canemap-system.web.app".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./canemap-offline-cache.sqlite")
}

fn default_user_agent() -> String {
    "canemap-gate/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_generation() -> String {
    "canemap-offline-v2".into()
}

fn default_offline_pages() -> Vec<String> {
    [
        "/frontend/Worker/Workers.html",
        "/frontend/Driver/Driver_Dashboard.html",
        "/backend/Worker/Workers.js",
        "/backend/Driver/Driver_Dashboard.js",
        "/backend/Driver/driver-ui.js",
        "/backend/Driver/driver-init.js",
        "/backend/Common/ui-popup.js",
        "/backend/Common/firebase-config.js",
    ]
    .map(String::from)
    .to_vec()
}

fn default_excluded_marker() -> String {
    "handler".into()
}

fn default_managed_markers() -> Vec<String> {
    ["/Worker/", "/Driver/", "/Common/"].map(String::from).to_vec()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            upstream_origin: default_upstream_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            generation: default_generation(),
            offline_pages: default_offline_pages(),
            excluded_marker: default_excluded_marker(),
            managed_markers: default_managed_markers(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The slice of configuration the gate itself consumes.
    pub fn gate(&self) -> GateConfig {
        GateConfig {
            generation: self.generation.clone(),
            offline_pages: self.offline_pages.clone(),
            excluded_marker: self.excluded_marker.clone(),
            managed_markers: self.managed_markers.clone(),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CANEMAP_`
    /// 2. TOML file from `CANEMAP_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("CANEMAP_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CANEMAP_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.listen_addr, "127.0.0.1:8787");
        assert_eq!(config.upstream_origin, "https://canemap-system.web.app");
        assert_eq!(config.db_path, PathBuf::from("./canemap-offline-cache.sqlite"));
        assert_eq!(config.user_agent, "canemap-gate/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.generation, "canemap-offline-v2");
        assert_eq!(config.offline_pages.len(), 8);
        assert_eq!(config.excluded_marker, "handler");
        assert_eq!(config.managed_markers, vec!["/Worker/", "/Driver/", "/Common/"]);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_gate_config_slice() {
        let config = AppConfig::default();
        let gate = config.gate();
        assert_eq!(gate.generation, config.generation);
        assert_eq!(gate.offline_pages, config.offline_pages);
        assert_eq!(gate.excluded_marker, config.excluded_marker);
        assert_eq!(gate.managed_markers, config.managed_markers);
    }

    #[test]
    fn test_default_offline_pages_are_absolute() {
        let config = AppConfig::default();
        assert!(config.offline_pages.iter().all(|p| p.starts_with('/')));
    }
}
