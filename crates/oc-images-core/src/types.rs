//! Wire types for the three JSON documents returned by the inspection backend
//!
//! Only the keys the engine reads are modelled; everything else in the
//! documents is ignored. A required key that is absent makes deserialization
//! fail, which surfaces as [`crate::Error::MalformedResponse`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Annotation carrying the source commit on payload references
pub const ANNOTATION_COMMIT: &str = "io.openshift.build.commit.id";

/// Annotation carrying the source repository on payload references
pub const ANNOTATION_SOURCE: &str = "io.openshift.build.source-location";

/// Output of `oc adm release info -o json <pullspec>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadInfo {
    /// The payload's own image reference
    pub image: String,
    pub references: PayloadReferences,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadReferences {
    pub spec: PayloadSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadSpec {
    pub tags: Vec<PayloadTag>,
}

/// One component image listed in a payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadTag {
    pub name: String,
    pub from: TagSource,
    #[serde(default)]
    pub annotations: Option<HashMap<String, String>>,
}

impl PayloadTag {
    /// Look up an annotation, returning an empty string when absent
    pub fn annotation(&self, key: &str) -> String {
        self.annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSource {
    pub name: String,
}

/// Output of `oc --namespace <ns> get is --output json <name>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagestreamInfo {
    pub metadata: ObjectMeta,
    pub status: ImagestreamStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagestreamStatus {
    pub tags: Vec<StatusTag>,
}

/// One tag of an imagestream; `items` is its history, most recent first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTag {
    pub tag: String,
    pub items: Vec<TagEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagEvent {
    pub docker_image_reference: String,
}

/// Output of `oc image info -o json <pullspec>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    pub config: ImageConfigEnvelope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfigEnvelope {
    pub config: ContainerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// `None` both when the key is absent and when it is `null`
    #[serde(rename = "Labels", default)]
    pub labels: Option<HashMap<String, String>>,
}
