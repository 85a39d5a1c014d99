use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use crate::error::{BrtError, Result};

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV_VAR: &str = "BRT_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub processor: ProcessorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Line marker that precedes the residential JSON document in a code file
    pub residential_marker: String,
    /// Number of data rows exercised by the pre-flight lookup sample
    pub sample_rows: usize,
    /// Hard cap on nested numbered-wrapper recursion while searching categories
    pub max_search_depth: usize,
    /// Highest numbered-wrapper index probed ("1" through this value)
    pub numbered_wrapper_max: usize,
    pub vendor_tag: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            residential_marker: "Residential".to_string(),
            sample_rows: 3,
            max_search_depth: 8,
            numbered_wrapper_max: 100,
            vendor_tag: crate::constants::BRT_VENDOR.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Load from an explicit path, else from `BRT_CONFIG`, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from),
        };

        let config = match path {
            Some(config_path) => Self::from_file(&config_path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            BrtError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let p = &self.processor;
        if p.residential_marker.trim().is_empty() {
            return Err(BrtError::Config("residential_marker must not be empty".to_string()));
        }
        if p.max_search_depth == 0 {
            return Err(BrtError::Config("max_search_depth must be at least 1".to_string()));
        }
        if p.numbered_wrapper_max == 0 {
            return Err(BrtError::Config("numbered_wrapper_max must be at least 1".to_string()));
        }
        Ok(())
    }
}
