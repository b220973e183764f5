//! Configuration management for the codec registry
//!
//! Settings are read from an optional TOML file and overridden by
//! `CQL_CODEC_*` environment variables.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file looked up by [`Config::load`]
pub const CONFIG_FILE: &str = "cql-codec.toml";

/// Upper bound accepted for `registry.max_type_depth`
const MAX_TYPE_DEPTH_LIMIT: usize = 1024;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry behaviour
    pub registry: RegistryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Decode tuple/UDT fields on first access instead of up front
    pub lazy_composites: bool,

    /// Maximum descriptor nesting accepted when parsing metadata or resolving
    pub max_type_depth: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            lazy_composites: true,
            max_type_depth: 64,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and config file
    pub fn load() -> Result<Self> {
        let mut config = if Path::new(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Config::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(lazy) = lookup("CQL_CODEC_LAZY_COMPOSITES") {
            self.registry.lazy_composites = lazy.parse()
                .map_err(|e| Error::config(format!("Invalid lazy composites flag: {}", e)))?;
        }

        if let Some(depth) = lookup("CQL_CODEC_MAX_TYPE_DEPTH") {
            self.registry.max_type_depth = depth.parse()
                .map_err(|e| Error::config(format!("Invalid max type depth: {}", e)))?;
        }

        if let Some(level) = lookup("CQL_CODEC_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = lookup("CQL_CODEC_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.registry.max_type_depth == 0 {
            return Err(Error::config("Max type depth must be at least 1"));
        }

        if self.registry.max_type_depth > MAX_TYPE_DEPTH_LIMIT {
            return Err(Error::config(format!(
                "Max type depth too large (maximum {})",
                MAX_TYPE_DEPTH_LIMIT
            )));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {},
            _ => return Err(Error::config("Invalid log level")),
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {},
            _ => return Err(Error::config("Invalid log format")),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.registry.lazy_composites);
        assert_eq!(config.registry.max_type_depth, 64);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str("[registry]\nlazy_composites = false\n").unwrap();
        assert!(!config.registry.lazy_composites);
        assert_eq!(config.registry.max_type_depth, 64);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"\nformat = \"json\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CQL_CODEC_LAZY_COMPOSITES", "false"),
            ("CQL_CODEC_MAX_TYPE_DEPTH", "16"),
            ("CQL_CODEC_LOG_LEVEL", "trace"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert!(!config.registry.lazy_composites);
        assert_eq!(config.registry.max_type_depth, 16);
        assert_eq!(config.logging.level, "trace");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        let err = config.apply_overrides(|key| {
            (key == "CQL_CODEC_MAX_TYPE_DEPTH").then(|| "deep".to_string())
        });
        assert!(matches!(err, Err(Error::Config(_))));

        config.registry.max_type_depth = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        assert!(Config::from_toml_str("[logging]\nformat = \"xml\"\n").is_err());
    }
}
