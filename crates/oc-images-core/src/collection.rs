//! Payloads and imagestreams as collections of named images

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use futures::stream::{self, TryStreamExt};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::backend::BackendClient;
use crate::error::{Error, Result};
use crate::image::ImageMetadata;
use crate::resolver::{assembly_to_imagestream, CollectionKind, Coordinates};
use crate::types::{ImagestreamInfo, PayloadInfo, ANNOTATION_COMMIT, ANNOTATION_SOURCE};

/// Images keyed by tag name, in the order the backend listed them
///
/// Inserting a name that is already present replaces the earlier image in
/// place, so the last entry wins while the first position is kept.
#[derive(Debug, Default)]
pub struct ImageMap {
    entries: Vec<ImageMetadata>,
    index: HashMap<String, usize>,
}

impl ImageMap {
    /// Insert an image, returning the one it replaced
    pub fn insert(&mut self, image: ImageMetadata) -> Option<ImageMetadata> {
        match self.index.get(image.name()) {
            Some(&idx) => Some(std::mem::replace(&mut self.entries[idx], image)),
            None => {
                self.index.insert(image.name().to_string(), self.entries.len());
                self.entries.push(image);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ImageMetadata> {
        self.index.get(name).map(|&idx| &self.entries[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tag names in listing order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(ImageMetadata::name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageMetadata> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a ImageMap {
    type Item = &'a ImageMetadata;
    type IntoIter = std::slice::Iter<'a, ImageMetadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Everything derived from the single payload/imagestream fetch
#[derive(Debug)]
struct CollectionContents {
    display_name: String,
    images: ImageMap,
}

/// A release payload or imagestream, loaded lazily from the backend
pub struct ImageCollection {
    pointer: String,
    backend: Arc<dyn BackendClient>,
    kind: OnceLock<CollectionKind>,
    coordinates: OnceLock<Coordinates>,
    contents: OnceCell<Result<CollectionContents>>,
}

impl ImageCollection {
    /// Create a collection for a payload pullspec or imagestream pointer
    pub fn new(pointer: impl Into<String>, backend: Arc<dyn BackendClient>) -> Self {
        Self {
            pointer: pointer.into(),
            backend,
            kind: OnceLock::new(),
            coordinates: OnceLock::new(),
            contents: OnceCell::new(),
        }
    }

    /// Create an imagestream collection from an assembly token such as `4.17.3`
    ///
    /// # Errors
    /// Returns [`Error::UnknownAssembly`] without contacting the backend when
    /// the token is not recognised
    pub fn from_assembly(token: &str, backend: Arc<dyn BackendClient>) -> Result<Self> {
        let pointer = assembly_to_imagestream(token)?;
        Ok(Self::new(pointer, backend))
    }

    /// The pointer as supplied by the caller
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    pub fn kind(&self) -> CollectionKind {
        *self
            .kind
            .get_or_init(|| CollectionKind::classify(&self.pointer))
    }

    /// Imagestream coordinates derived from the pointer
    pub fn coordinates(&self) -> &Coordinates {
        self.coordinates
            .get_or_init(|| Coordinates::from_pointer(&self.pointer))
    }

    /// Whether the backend document has been fetched already
    pub fn is_loaded(&self) -> bool {
        self.contents.initialized()
    }

    /// The payload's own image reference, or `namespace/name` of the imagestream
    pub async fn display_name(&self) -> Result<&str> {
        Ok(&self.contents().await?.display_name)
    }

    /// Images of the collection keyed by tag name
    pub async fn images(&self) -> Result<&ImageMap> {
        Ok(&self.contents().await?.images)
    }

    async fn contents(&self) -> Result<&CollectionContents> {
        self.contents
            .get_or_init(|| self.load())
            .await
            .as_ref()
            .map_err(Clone::clone)
    }

    async fn load(&self) -> Result<CollectionContents> {
        let contents = match self.kind() {
            CollectionKind::Payload => self.load_payload().await?,
            CollectionKind::Imagestream => self.load_imagestream().await?,
        };

        info!(
            "Loaded {} images from {} {}",
            contents.images.len(),
            self.kind(),
            contents.display_name
        );
        Ok(contents)
    }

    async fn load_payload(&self) -> Result<CollectionContents> {
        let value = self.backend.fetch_payload_info(&self.pointer).await?;
        let info: PayloadInfo = serde_json::from_value(value).map_err(|e| {
            Error::malformed(format!("payload info for {}", self.pointer), e.to_string())
        })?;

        let mut images = ImageMap::default();
        for tag in info.references.spec.tags {
            let commit = tag.annotation(ANNOTATION_COMMIT);
            let source = tag.annotation(ANNOTATION_SOURCE);
            let image = ImageMetadata::new(tag.name, tag.from.name, Arc::clone(&self.backend))
                .with_annotations(commit, source);
            if let Some(previous) = images.insert(image) {
                debug!("Duplicate payload tag {} replaced", previous.name());
            }
        }

        Ok(CollectionContents {
            display_name: info.image,
            images,
        })
    }

    async fn load_imagestream(&self) -> Result<CollectionContents> {
        let coordinates = self.coordinates();
        let value = self
            .backend
            .fetch_imagestream_info(&coordinates.namespace, &coordinates.name)
            .await?;
        let context = format!("imagestream {}", coordinates);
        let info: ImagestreamInfo =
            serde_json::from_value(value).map_err(|e| Error::malformed(&context, e.to_string()))?;

        let mut images = ImageMap::default();
        for tag in info.status.tags {
            // items are the tag history, most recent first
            let latest = tag.items.into_iter().next().ok_or_else(|| {
                Error::malformed(&context, format!("tag {} has no items", tag.tag))
            })?;
            let image = ImageMetadata::new(
                tag.tag,
                latest.docker_image_reference,
                Arc::clone(&self.backend),
            );
            if let Some(previous) = images.insert(image) {
                debug!("Duplicate imagestream tag {} replaced", previous.name());
            }
        }

        Ok(CollectionContents {
            display_name: format!("{}/{}", info.metadata.namespace, info.metadata.name),
            images,
        })
    }

    /// Names of the images labelled as release operators, in listing order
    pub async fn release_operator_images(&self, concurrency: usize) -> Result<Vec<&str>> {
        let images = self.images().await?;

        let mut flagged: Vec<(usize, &str)> = stream::iter(images.iter().enumerate().map(
            |(idx, image)| {
                Ok::<_, Error>(async move {
                    let flag = image.is_release_operator().await?;
                    Ok::<_, Error>((idx, image.name(), flag))
                })
            },
        ))
        .try_buffer_unordered(concurrency.max(1))
        .try_filter_map(|(idx, name, flag)| async move { Ok::<_, Error>(flag.then_some((idx, name))) })
        .try_collect()
        .await?;

        flagged.sort_by_key(|(idx, _)| *idx);
        Ok(flagged.into_iter().map(|(_, name)| name).collect())
    }
}

impl fmt::Debug for ImageCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageCollection")
            .field("pointer", &self.pointer)
            .field("kind", &self.kind.get())
            .field("coordinates", &self.coordinates.get())
            .field("contents", &self.contents.get())
            .finish_non_exhaustive()
    }
}

/// Resolve the NVRs of `images` concurrently, returning them in input order
///
/// The first failure aborts the remaining fetches and is returned as is.
pub async fn resolve_nvrs(images: &[&ImageMetadata], concurrency: usize) -> Result<Vec<String>> {
    let mut resolved: Vec<(usize, String)> =
        stream::iter(images.iter().enumerate().map(|(idx, image)| {
            Ok::<_, Error>(async move { image.nvr().await.map(|nvr| (idx, nvr)) })
        }))
        .try_buffer_unordered(concurrency.max(1))
        .try_collect()
        .await?;

    resolved.sort_by_key(|(idx, _)| *idx);
    Ok(resolved.into_iter().map(|(_, nvr)| nvr).collect())
}
