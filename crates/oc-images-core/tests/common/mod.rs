//! Common test helpers for oc-images-core integration tests
//!
//! Provides an in-memory [`FakeBackend`] that serves canned JSON documents,
//! records every call for verification and can inject failures or latency.

use async_trait::async_trait;
use oc_images_core::{BackendClient, Error, Result};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ─── Fake Backend ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FakeBackend {
    payloads: HashMap<String, Value>,
    imagestreams: HashMap<String, Value>,
    images: HashMap<String, Value>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(mut self, pointer: &str, document: Value) -> Self {
        self.payloads.insert(pointer.to_string(), document);
        self
    }

    pub fn with_imagestream(mut self, namespace: &str, name: &str, document: Value) -> Self {
        self.imagestreams
            .insert(format!("{}/{}", namespace, name), document);
        self
    }

    pub fn with_image(mut self, pullspec: &str, document: Value) -> Self {
        self.images.insert(pullspec.to_string(), document);
        self
    }

    /// Make every call for `key` (pointer, `namespace/name` or pullspec) fail
    pub fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    /// Sleep before answering so concurrent callers overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// All recorded calls, formatted as `kind:key`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls recorded for `kind:key`
    pub fn call_count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    /// Number of image info calls of any pullspec
    pub fn image_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with("image:"))
            .count()
    }

    async fn answer(&self, kind: &str, key: &str, documents: &HashMap<String, Value>) -> Result<Value> {
        self.calls.lock().unwrap().push(format!("{}:{}", kind, key));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let command = format!("fake {} {}", kind, key);
        if self.failing.contains(key) {
            return Err(Error::backend(command, "injected failure"));
        }
        documents
            .get(key)
            .cloned()
            .ok_or_else(|| Error::backend(command, format!("{} not found", key)))
    }
}

#[async_trait]
impl BackendClient for FakeBackend {
    async fn fetch_payload_info(&self, pointer: &str) -> Result<Value> {
        self.answer("payload", pointer, &self.payloads).await
    }

    async fn fetch_imagestream_info(&self, namespace: &str, name: &str) -> Result<Value> {
        let key = format!("{}/{}", namespace, name);
        self.answer("imagestream", &key, &self.imagestreams).await
    }

    async fn fetch_image_info(&self, pullspec: &str) -> Result<Value> {
        self.answer("image", pullspec, &self.images).await
    }
}

// ─── Document Builders ───────────────────────────────────────────────────────

/// `oc adm release info -o json` document listing `(name, pullspec)` tags
#[allow(dead_code)]
pub fn payload_doc(image: &str, tags: &[(&str, &str)]) -> Value {
    let tags: Vec<Value> = tags
        .iter()
        .map(|(name, pullspec)| {
            json!({
                "name": name,
                "from": {"kind": "DockerImage", "name": pullspec},
                "annotations": {
                    "io.openshift.build.commit.id": format!("{}-commit", name),
                    "io.openshift.build.source-location": format!("https://github.com/openshift/{}", name),
                }
            })
        })
        .collect();

    json!({
        "image": image,
        "digest": "sha256:0000",
        "references": {
            "kind": "ImageStream",
            "spec": {"tags": tags}
        }
    })
}

/// `oc get is -o json` document listing `(tag, pullspec)` with one history item each
#[allow(dead_code)]
pub fn imagestream_doc(namespace: &str, name: &str, tags: &[(&str, &str)]) -> Value {
    let tags: Vec<Value> = tags
        .iter()
        .map(|(tag, pullspec)| {
            json!({
                "tag": tag,
                "items": [
                    {"dockerImageReference": pullspec, "generation": 2},
                    {"dockerImageReference": "quay.io/old@sha256:ffff", "generation": 1}
                ]
            })
        })
        .collect();

    json!({
        "kind": "ImageStream",
        "metadata": {"namespace": namespace, "name": name},
        "status": {"tags": tags}
    })
}

/// `oc image info -o json` document with ART build labels
#[allow(dead_code)]
pub fn image_doc(component: &str, version: &str, release: &str) -> Value {
    json!({
        "digest": "sha256:1111",
        "config": {
            "architecture": "amd64",
            "config": {
                "Labels": {
                    "com.redhat.component": component,
                    "version": version,
                    "release": release,
                    "io.openshift.build.commit.id": "label-commit",
                }
            }
        }
    })
}
