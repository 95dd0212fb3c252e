//! CLI command implementations

pub mod diff;
pub mod list;

use std::sync::Arc;

use anyhow::{Context, Result};
use camino::Utf8Path;
use oc_images_core::{BackendClient, Config, OcBackend};

/// Shared state for a command run
pub struct Session {
    pub config: Config,
    pub backend: Arc<dyn BackendClient>,
    /// Whether spinners may be drawn on stderr
    pub progress: bool,
}

impl Session {
    /// Load configuration and locate the `oc` backend
    pub fn new(
        config_path: Option<&Utf8Path>,
        filter_by_os: Option<String>,
        quiet: bool,
    ) -> Result<Self> {
        let mut config = Config::load(config_path).context("Failed to load configuration")?;
        if filter_by_os.is_some() {
            config.filter_by_os = filter_by_os;
        }

        let backend = OcBackend::from_config(&config).context("Failed to set up the oc backend")?;

        Ok(Self {
            config,
            backend: Arc::new(backend),
            progress: !quiet,
        })
    }
}
