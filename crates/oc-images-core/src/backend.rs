//! Image inspection backend
//!
//! The engine reads three JSON documents: release payload info, imagestream
//! info and per-image config. [`BackendClient`] abstracts where they come
//! from; [`OcBackend`] obtains them by running the `oc` CLI.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::config::Config;
use crate::error::{Error, Result};

/// Source of the JSON documents describing payloads, imagestreams and images
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Release payload metadata for a payload pullspec
    async fn fetch_payload_info(&self, pointer: &str) -> Result<Value>;

    /// Imagestream metadata for a namespace and name
    async fn fetch_imagestream_info(&self, namespace: &str, name: &str) -> Result<Value>;

    /// Image config (including labels) for a pullspec
    async fn fetch_image_info(&self, pullspec: &str) -> Result<Value>;
}

/// Backend that shells out to the `oc` CLI
#[derive(Debug, Clone)]
pub struct OcBackend {
    oc_path: PathBuf,
    filter_by_os: Option<String>,
}

impl OcBackend {
    /// Create a backend running the given `oc` executable
    pub fn new(oc_path: impl Into<PathBuf>) -> Self {
        Self {
            oc_path: oc_path.into(),
            filter_by_os: None,
        }
    }

    /// Locate the configured `oc` binary and apply the configured options
    ///
    /// # Errors
    /// Returns a backend error if the binary cannot be found in PATH
    pub fn from_config(config: &Config) -> Result<Self> {
        let oc_path = which::which(&config.oc_binary).map_err(|e| {
            Error::backend(
                config.oc_binary.as_str(),
                format!("{} not found in PATH: {}", config.oc_binary, e),
            )
        })?;

        debug!("Found oc at: {:?}", oc_path);

        let mut backend = Self::new(oc_path);
        if let Some(os) = &config.filter_by_os {
            backend = backend.with_filter_by_os(os.clone());
        }
        Ok(backend)
    }

    /// Pass `--filter-by-os` to `oc image info`, needed for manifest lists
    pub fn with_filter_by_os(mut self, os: impl Into<String>) -> Self {
        self.filter_by_os = Some(os.into());
        self
    }

    pub fn oc_path(&self) -> &Path {
        &self.oc_path
    }

    /// Arguments for `oc image info`
    fn image_info_args(&self, pullspec: &str) -> Vec<String> {
        let mut args = vec!["image".into(), "info".into(), "-o".into(), "json".into()];
        if let Some(os) = &self.filter_by_os {
            args.push(format!("--filter-by-os={}", os));
        }
        args.push(pullspec.into());
        args
    }

    /// Run `oc` with the given arguments and parse its stdout as JSON
    async fn run_json(&self, args: &[String]) -> Result<Value> {
        let command = format!("{} {}", self.oc_path.display(), args.join(" "));
        debug!("Running: {}", command);

        let output = Command::new(&self.oc_path)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::backend(&command, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            return Err(Error::backend(command, message));
        }

        trace!("{} returned {} bytes", command, output.stdout.len());

        serde_json::from_slice(&output.stdout).map_err(|e| Error::malformed(command, e.to_string()))
    }
}

#[async_trait]
impl BackendClient for OcBackend {
    async fn fetch_payload_info(&self, pointer: &str) -> Result<Value> {
        let args: Vec<String> = ["adm", "release", "info", "-o", "json", pointer]
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.run_json(&args).await
    }

    async fn fetch_imagestream_info(&self, namespace: &str, name: &str) -> Result<Value> {
        let args: Vec<String> = ["--namespace", namespace, "get", "is", "--output", "json", name]
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.run_json(&args).await
    }

    async fn fetch_image_info(&self, pullspec: &str) -> Result<Value> {
        let args = self.image_info_args(pullspec);
        self.run_json(&args).await
    }
}
