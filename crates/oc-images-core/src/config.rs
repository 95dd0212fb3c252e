//! Runtime configuration
//!
//! Resolution order: built-in defaults, then the YAML config file
//! (`$XDG_CONFIG_HOME/oc-images/config.yaml` unless an explicit path is
//! given), then `OC_IMAGES_*` environment variables.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::debug;

use crate::error::{Error, Result};

/// Default executable used by the `oc` backend
pub const DEFAULT_OC_BINARY: &str = "oc";

/// Default number of concurrent backend calls in a batch
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Configuration file name inside the config directory
const CONFIG_FILE_NAME: &str = "config.yaml";

const ENV_OC_BINARY: &str = "OC_IMAGES_OC_BINARY";
const ENV_CONCURRENCY: &str = "OC_IMAGES_CONCURRENCY";
const ENV_FILTER_BY_OS: &str = "OC_IMAGES_FILTER_BY_OS";

/// oc-images configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name or path of the `oc` executable
    pub oc_binary: String,

    /// Maximum number of backend calls in flight during a batch
    pub concurrency: usize,

    /// Platform passed to `oc image info --filter-by-os` (e.g. `linux/amd64`)
    pub filter_by_os: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            oc_binary: DEFAULT_OC_BINARY.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            filter_by_os: None,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location if it exists
    ///
    /// # Errors
    /// Fails if an explicit path is missing, a file cannot be parsed, or an
    /// environment override is invalid
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file location, if a home directory can be determined
    pub fn default_path() -> Option<Utf8PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "oc-images")?;
        Utf8PathBuf::from_path_buf(dirs.config_dir().join(CONFIG_FILE_NAME)).ok()
    }

    /// Parse a YAML config file
    pub fn from_file(path: &Utf8Path) -> Result<Self> {
        debug!("Loading configuration from {}", path);

        let content = fs::read_to_string(path)
            .map_err(|e| Error::invalid_config(format!("cannot read {}: {}", path, e)))?;

        Self::from_yaml(&content)
            .map_err(|e| Error::invalid_config(format!("{}: {}", path, e)))
    }

    /// Parse YAML content; an empty document yields the defaults
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml_ng::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(content)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(binary) = std::env::var(ENV_OC_BINARY) {
            self.oc_binary = binary;
        }

        if let Ok(raw) = std::env::var(ENV_CONCURRENCY) {
            self.concurrency = raw.parse().map_err(|_| {
                Error::invalid_config(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_CONCURRENCY, raw
                ))
            })?;
        }

        if let Ok(os) = std::env::var(ENV_FILTER_BY_OS) {
            self.filter_by_os = if os.is_empty() { None } else { Some(os) };
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::invalid_config("concurrency must be at least 1"));
        }
        if self.oc_binary.trim().is_empty() {
            return Err(Error::invalid_config("oc_binary must not be empty"));
        }
        Ok(())
    }
}
