//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `upstream_origin` is not an absolute http(s) origin
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `generation` is empty
    /// - any offline page is not an absolute path
    /// - the marker lists are empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.upstream_origin.starts_with("http://") && !self.upstream_origin.starts_with("https://") {
            return Err(ConfigError::Invalid {
                field: "upstream_origin".into(),
                reason: "must start with http:// or https://".into(),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.generation.is_empty() {
            return Err(ConfigError::Invalid { field: "generation".into(), reason: "must not be empty".into() });
        }

        if let Some(page) = self.offline_pages.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "offline_pages".into(),
                reason: format!("'{page}' is not an absolute path"),
            });
        }

        if self.excluded_marker.is_empty() {
            return Err(ConfigError::Invalid {
                field: "excluded_marker".into(),
                reason: "must not be empty".into(),
            });
        }

        if self.managed_markers.is_empty() || self.managed_markers.iter().any(|marker| marker.is_empty()) {
            return Err(ConfigError::Invalid {
                field: "managed_markers".into(),
                reason: "must contain at least one non-empty marker".into(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_relative_origin() {
        let config = AppConfig { upstream_origin: "canemap-system.web.app".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "upstream_origin"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_empty_generation() {
        let config = AppConfig { generation: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "generation"));
    }

    #[test]
    fn test_validate_relative_offline_page() {
        let config = AppConfig {
            offline_pages: vec!["frontend/Worker/Workers.html".into()],
            ..Default::default()
        };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "offline_pages"));
    }

    #[test]
    fn test_validate_empty_managed_markers() {
        let config = AppConfig { managed_markers: Vec::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "managed_markers"));
    }

    #[test]
    fn test_validate_http_origin_allowed() {
        let config = AppConfig { upstream_origin: "http://localhost:5000".into(), ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
