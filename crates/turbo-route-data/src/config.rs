//! Route data configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::logging::LogFormat;
use crate::redirect::RedirectPolicy;
use crate::store::ReconcileOptions;

/// Route data configuration file.
///
/// ```toml
/// [reconcile]
/// key = "sku"
/// merge = false
///
/// [redirect]
/// statuses = [301, 302, 303, 307, 308]
///
/// [logging]
/// format = "human"
/// filter = "turbo_route_data=debug"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteDataConfig {
    /// How fetched values are reconciled into the cell.
    #[serde(default)]
    pub reconcile: ReconcileOptions,

    /// Which responses are redirects.
    #[serde(default)]
    pub redirect: RedirectConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RouteDataConfig {
    /// Load config from a file. `.json` files are read as JSON, anything
    /// else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        } else {
            Self::from_toml_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
        }
    }

    /// Parse TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a file, in the format its extension names.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self)?
        };
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Set reconcile options.
    pub fn with_reconcile(mut self, reconcile: ReconcileOptions) -> Self {
        self.reconcile = reconcile;
        self
    }

    /// Set the redirect statuses. Empty means any 3xx.
    pub fn with_redirect_statuses(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.redirect.statuses = statuses.into();
        self
    }

    /// Set the log format and filter.
    pub fn with_logging(mut self, format: LogFormat, filter: impl Into<String>) -> Self {
        self.logging = LoggingConfig {
            format,
            filter: filter.into(),
        };
        self
    }

    /// The redirect policy described by this config.
    pub fn redirect_policy(&self) -> RedirectPolicy {
        RedirectPolicy::from_statuses(&self.redirect.statuses)
    }

    fn validate(&self) -> Result<()> {
        if let Some(bad) = self.redirect.statuses.iter().find(|s| !(300..400).contains(*s)) {
            anyhow::bail!("redirect status {} is not a 3xx status", bad);
        }
        if self.reconcile.key.as_deref() == Some("") {
            anyhow::bail!("reconcile key must not be empty");
        }
        Ok(())
    }
}

/// Redirect detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Statuses treated as redirects. Empty means any 3xx.
    #[serde(default)]
    pub statuses: Vec<u16>,
}

/// Log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// `EnvFilter` directives.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RouteDataConfig::from_toml_str("").unwrap();
        assert_eq!(config, RouteDataConfig::default());
        assert_eq!(config.reconcile.key.as_deref(), Some("id"));
        assert!(!config.reconcile.merge);
        assert_eq!(config.redirect_policy(), RedirectPolicy::AnyRedirection);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_parse_toml() {
        let config = RouteDataConfig::from_toml_str(
            r#"
            [reconcile]
            key = "sku"
            merge = true

            [redirect]
            statuses = [302, 303]

            [logging]
            format = "human"
            filter = "turbo_route_data=debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.reconcile.key.as_deref(), Some("sku"));
        assert!(config.reconcile.merge);
        assert_eq!(config.redirect_policy(), RedirectPolicy::Statuses(vec![302, 303]));
        assert_eq!(config.logging.format, LogFormat::Human);
        assert_eq!(config.logging.filter, "turbo_route_data=debug");
    }

    #[test]
    fn test_parse_json() {
        let config =
            RouteDataConfig::from_json_str(r#"{"redirect": {"statuses": [307]}}"#).unwrap();
        assert_eq!(config.redirect.statuses, vec![307]);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_non_redirect_status() {
        let err = RouteDataConfig::from_toml_str("[redirect]\nstatuses = [200]").unwrap_err();
        assert!(err.to_string().contains("200"));
    }

    #[test]
    fn test_builders() {
        let config = RouteDataConfig::default()
            .with_reconcile(ReconcileOptions::default().without_key())
            .with_redirect_statuses([301])
            .with_logging(LogFormat::Human, "debug");

        assert_eq!(config.reconcile.key, None);
        assert_eq!(config.redirect_policy(), RedirectPolicy::Statuses(vec![301]));
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn test_load_and_save_by_extension() {
        let dir = std::env::temp_dir().join(format!("turbo-route-data-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = RouteDataConfig::default().with_redirect_statuses([303]);

        for name in ["route-data.toml", "route-data.json"] {
            let path = dir.join(name);
            config.save(&path).unwrap();
            assert_eq!(RouteDataConfig::load(&path).unwrap(), config);
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let err = RouteDataConfig::load("/nonexistent/route-data.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
