//! Weaving configuration.
//!
//! Loaded from YAML with environment variable overrides. All keys are
//! lowercased by the loader, so named pointcuts are looked up in lowercase.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Result, WeaveError};
use crate::pointcut::PointcutSpec;

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "wove.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "WOVE_CONFIG";
/// Environment variable prefix for configuration overrides (`WOVE__ENABLED`).
pub const CONFIG_ENV_PREFIX: &str = "WOVE";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "WOVE_LOG";

/// Runtime configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeaveConfig {
    /// When false, weaving requests leave method slots untouched.
    pub enabled: bool,
    /// Log the matched advice plan of every woven call at debug level.
    pub trace_calls: bool,
    /// Pointcuts that aspects can refer to by name.
    pub pointcuts: HashMap<String, PointcutSpec>,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trace_calls: false,
            pointcuts: HashMap::new(),
        }
    }
}

impl WeaveConfig {
    /// Load configuration from file and environment.
    ///
    /// Sources, later ones overriding earlier ones: `wove.yaml` in the current
    /// directory (optional), `path` (required if given), the file named by
    /// `WOVE_CONFIG` (required if set), then `WOVE__*` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Parse configuration from an inline YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        use ::config::{Config as ConfigLib, File, FileFormat};

        let config = ConfigLib::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Named pointcut.
    pub fn pointcut(&self, name: &str) -> Result<&PointcutSpec> {
        self.pointcuts
            .get(&name.to_lowercase())
            .ok_or_else(|| WeaveError::UnknownPointcut(name.to_string()))
    }
}
