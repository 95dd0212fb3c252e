//! Single image metadata with lazily fetched labels

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::backend::BackendClient;
use crate::error::{Error, Result};
use crate::types::ImageInfo;

/// Component used when an image carries no `com.redhat.component` label
pub const DEFAULT_COMPONENT: &str = "rhel-coreos";

const LABEL_VERSION: (&str, &str) = ("version", "org.opencontainers.image.version");
const LABEL_RELEASE: (&str, &str) = ("release", "coreos.build.manifest-list-tag");
const LABEL_COMMIT: (&str, &str) = (
    "io.openshift.build.commit.id",
    "org.opencontainers.image.revision",
);
const LABEL_SOURCE: (&str, &str) = (
    "io.openshift.build.source-location",
    "org.opencontainers.image.source",
);
const LABEL_COMPONENT: &str = "com.redhat.component";
const LABEL_RELEASE_OPERATOR: &str = "io.openshift.release.operator";

/// Fields derived from an image's labels, always filled together
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageLabels {
    pub version: Option<String>,
    pub release: Option<String>,
    pub commit: Option<String>,
    pub component: String,
    pub source_repo: Option<String>,
    pub is_release_operator: bool,
}

impl ImageLabels {
    /// Extract the fields from a label map, honouring the fallback labels
    pub fn from_labels(labels: &HashMap<String, String>) -> Self {
        let lookup = |(primary, fallback): (&str, &str)| {
            labels.get(primary).or_else(|| labels.get(fallback)).cloned()
        };

        Self {
            version: lookup(LABEL_VERSION),
            release: lookup(LABEL_RELEASE),
            commit: lookup(LABEL_COMMIT),
            component: labels
                .get(LABEL_COMPONENT)
                .cloned()
                .unwrap_or_else(|| DEFAULT_COMPONENT.to_string()),
            source_repo: lookup(LABEL_SOURCE),
            is_release_operator: labels.contains_key(LABEL_RELEASE_OPERATOR),
        }
    }

    /// `{component}-{version}-{release}`; absent parts render empty
    pub fn nvr(&self) -> String {
        format!(
            "{}-{}-{}",
            self.component,
            self.version.as_deref().unwrap_or_default(),
            self.release.as_deref().unwrap_or_default()
        )
    }
}

/// One named image of a payload or imagestream
pub struct ImageMetadata {
    name: String,
    pullspec: String,
    annotated_commit: String,
    annotated_source: String,
    backend: Arc<dyn BackendClient>,
    labels: OnceCell<Result<ImageLabels>>,
}

impl ImageMetadata {
    pub fn new(
        name: impl Into<String>,
        pullspec: impl Into<String>,
        backend: Arc<dyn BackendClient>,
    ) -> Self {
        Self {
            name: name.into(),
            pullspec: pullspec.into(),
            annotated_commit: String::new(),
            annotated_source: String::new(),
            backend,
            labels: OnceCell::new(),
        }
    }

    /// Attach the commit and source annotations a payload lists for this image
    pub fn with_annotations(mut self, commit: impl Into<String>, source: impl Into<String>) -> Self {
        self.annotated_commit = commit.into();
        self.annotated_source = source.into();
        self
    }

    /// Tag name within the collection
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registry reference, usually digest-qualified
    pub fn pullspec(&self) -> &str {
        &self.pullspec
    }

    /// Whether the labels have been fetched already
    pub fn is_resolved(&self) -> bool {
        self.labels.initialized()
    }

    /// Label-derived fields, fetching them on first use
    ///
    /// Concurrent callers share one in-flight fetch, and the outcome
    /// (including a failure) is kept for the rest of the run.
    pub async fn labels(&self) -> Result<&ImageLabels> {
        self.labels
            .get_or_init(|| self.fetch_labels())
            .await
            .as_ref()
            .map_err(Clone::clone)
    }

    async fn fetch_labels(&self) -> Result<ImageLabels> {
        debug!("Fetching image info for {} ({})", self.name, self.pullspec);

        let value = self.backend.fetch_image_info(&self.pullspec).await?;
        let context = format!("image info for {}", self.pullspec);

        let info: ImageInfo =
            serde_json::from_value(value).map_err(|e| Error::malformed(&context, e.to_string()))?;
        let labels = info
            .config
            .config
            .labels
            .ok_or_else(|| Error::malformed(&context, "missing config.config.Labels"))?;

        Ok(ImageLabels::from_labels(&labels))
    }

    pub async fn nvr(&self) -> Result<String> {
        Ok(self.labels().await?.nvr())
    }

    pub async fn version(&self) -> Result<Option<&str>> {
        Ok(self.labels().await?.version.as_deref())
    }

    pub async fn release(&self) -> Result<Option<&str>> {
        Ok(self.labels().await?.release.as_deref())
    }

    pub async fn component(&self) -> Result<&str> {
        Ok(&self.labels().await?.component)
    }

    /// Source commit; the payload annotation wins and needs no fetch
    pub async fn commit(&self) -> Result<Option<&str>> {
        if !self.annotated_commit.is_empty() {
            return Ok(Some(self.annotated_commit.as_str()));
        }
        Ok(self.labels().await?.commit.as_deref())
    }

    /// Source repository; the payload annotation wins and needs no fetch
    pub async fn source_repo(&self) -> Result<Option<&str>> {
        if !self.annotated_source.is_empty() {
            return Ok(Some(self.annotated_source.as_str()));
        }
        Ok(self.labels().await?.source_repo.as_deref())
    }

    pub async fn is_release_operator(&self) -> Result<bool> {
        Ok(self.labels().await?.is_release_operator)
    }
}

impl fmt::Display for ImageMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.pullspec)
    }
}

impl fmt::Debug for ImageMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageMetadata")
            .field("name", &self.name)
            .field("pullspec", &self.pullspec)
            .field("annotated_commit", &self.annotated_commit)
            .field("annotated_source", &self.annotated_source)
            .field("labels", &self.labels.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_primary_labels() {
        let parsed = ImageLabels::from_labels(&labels(&[
            ("com.redhat.component", "ironic-container"),
            ("version", "v4.18.0"),
            ("release", "202502250302.p0.g526498a.assembly.stream.el9"),
            ("io.openshift.build.commit.id", "526498a"),
            ("io.openshift.build.source-location", "https://github.com/openshift/ironic"),
            ("org.opencontainers.image.version", "ignored"),
        ]));
        assert_eq!(
            parsed.nvr(),
            "ironic-container-v4.18.0-202502250302.p0.g526498a.assembly.stream.el9"
        );
        assert_eq!(parsed.commit.as_deref(), Some("526498a"));
        assert_eq!(
            parsed.source_repo.as_deref(),
            Some("https://github.com/openshift/ironic")
        );
        assert!(!parsed.is_release_operator);
    }

    #[test]
    fn test_fallback_labels_and_default_component() {
        let parsed = ImageLabels::from_labels(&labels(&[
            ("org.opencontainers.image.version", "418.94.202502251402-0"),
            ("coreos.build.manifest-list-tag", "4.18-9.4-node-image"),
            ("org.opencontainers.image.revision", "abc123"),
            ("org.opencontainers.image.source", "https://github.com/openshift/os"),
        ]));
        assert_eq!(parsed.component, DEFAULT_COMPONENT);
        assert_eq!(
            parsed.nvr(),
            "rhel-coreos-418.94.202502251402-0-4.18-9.4-node-image"
        );
        assert_eq!(parsed.commit.as_deref(), Some("abc123"));
        assert_eq!(
            parsed.source_repo.as_deref(),
            Some("https://github.com/openshift/os")
        );
    }

    #[test]
    fn test_release_operator_label_value_is_ignored() {
        let parsed = ImageLabels::from_labels(&labels(&[("io.openshift.release.operator", "")]));
        assert!(parsed.is_release_operator);
    }

    #[test]
    fn test_missing_version_and_release_render_empty() {
        let parsed = ImageLabels::from_labels(&HashMap::new());
        assert_eq!(parsed.nvr(), "rhel-coreos--");
    }

    #[test]
    fn test_display_without_fetch() {
        struct NoBackend;

        #[async_trait::async_trait]
        impl BackendClient for NoBackend {
            async fn fetch_payload_info(&self, _: &str) -> Result<serde_json::Value> {
                unreachable!()
            }
            async fn fetch_imagestream_info(&self, _: &str, _: &str) -> Result<serde_json::Value> {
                unreachable!()
            }
            async fn fetch_image_info(&self, _: &str) -> Result<serde_json::Value> {
                unreachable!()
            }
        }

        let image = ImageMetadata::new("cli", "quay.io/art@sha256:01", Arc::new(NoBackend));
        assert_eq!(image.to_string(), "cli: quay.io/art@sha256:01");
        assert!(!image.is_resolved());
    }
}
