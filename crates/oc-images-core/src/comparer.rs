//! Differences between two image collections

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::stream::{self, TryStreamExt};
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::backend::BackendClient;
use crate::collection::ImageCollection;
use crate::config::DEFAULT_CONCURRENCY;
use crate::error::{Error, Result};

/// Image names present in only one of the two collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameDiff {
    /// Display name of the first collection
    pub first: String,
    /// Display name of the second collection
    pub second: String,
    pub only_in_first: BTreeSet<String>,
    pub only_in_second: BTreeSet<String>,
    /// Names present in both collections
    pub common: BTreeSet<String>,
}

impl NameDiff {
    /// Each side's display name with the names only it contains
    pub fn sides(&self) -> [(&str, &BTreeSet<String>); 2] {
        [
            (self.first.as_str(), &self.only_in_first),
            (self.second.as_str(), &self.only_in_second),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.only_in_first.is_empty() && self.only_in_second.is_empty()
    }
}

/// NVRs of one image whose pullspec differs between the collections
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct NvrDiff {
    pub name: String,
    pub first: String,
    pub second: String,
}

/// Complete comparison of two collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonReport {
    pub names: NameDiff,
    pub nvrs: Vec<NvrDiff>,
}

/// Compares the contents of two collections
#[derive(Debug)]
pub struct Comparer {
    first: ImageCollection,
    second: ImageCollection,
    concurrency: usize,
    name_diff: OnceCell<NameDiff>,
}

impl Comparer {
    pub fn new(first: ImageCollection, second: ImageCollection) -> Self {
        Self {
            first,
            second,
            concurrency: DEFAULT_CONCURRENCY,
            name_diff: OnceCell::new(),
        }
    }

    /// Build collections for two pointers sharing one backend
    pub fn from_pointers(first: &str, second: &str, backend: Arc<dyn BackendClient>) -> Self {
        Self::new(
            ImageCollection::new(first, Arc::clone(&backend)),
            ImageCollection::new(second, backend),
        )
    }

    /// Limit the number of image fetches in flight during [`Self::value_diff`]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn first(&self) -> &ImageCollection {
        &self.first
    }

    pub fn second(&self) -> &ImageCollection {
        &self.second
    }

    /// Names only in either collection; both collections are loaded concurrently
    pub async fn name_diff(&self) -> Result<&NameDiff> {
        self.name_diff.get_or_try_init(|| self.compute_name_diff()).await
    }

    async fn compute_name_diff(&self) -> Result<NameDiff> {
        let (first_images, second_images) =
            futures::try_join!(self.first.images(), self.second.images())?;

        let a: BTreeSet<String> = first_images.names().map(str::to_string).collect();
        let b: BTreeSet<String> = second_images.names().map(str::to_string).collect();

        let diff = NameDiff {
            first: self.first.display_name().await?.to_string(),
            second: self.second.display_name().await?.to_string(),
            only_in_first: a.difference(&b).cloned().collect(),
            only_in_second: b.difference(&a).cloned().collect(),
            common: a.intersection(&b).cloned().collect(),
        };

        debug!(
            "Name diff: {} only in {}, {} only in {}, {} common",
            diff.only_in_first.len(),
            diff.first,
            diff.only_in_second.len(),
            diff.second,
            diff.common.len()
        );
        Ok(diff)
    }

    /// NVRs of every common image whose pullspecs differ, sorted by name
    ///
    /// Images with identical pullspec strings are skipped without a fetch.
    /// NVRs are resolved concurrently; the first failure aborts the batch.
    pub async fn value_diff(&self) -> Result<Vec<NvrDiff>> {
        let names = self.name_diff().await?;
        let first_images = self.first.images().await?;
        let second_images = self.second.images().await?;

        let mut pairs = Vec::new();
        for name in &names.common {
            let (Some(first), Some(second)) = (first_images.get(name), second_images.get(name))
            else {
                return Err(Error::malformed(
                    "name diff",
                    format!("common image {} missing from a collection", name),
                ));
            };
            if first.pullspec() == second.pullspec() {
                continue;
            }
            pairs.push((name, first, second));
        }

        info!(
            "Resolving NVRs for {} of {} common images",
            pairs.len(),
            names.common.len()
        );

        let mut diffs: Vec<NvrDiff> = stream::iter(pairs.into_iter().map(|(name, first, second)| {
            Ok::<_, Error>(async move {
                let (first_nvr, second_nvr) = futures::try_join!(first.nvr(), second.nvr())?;
                Ok::<_, Error>(NvrDiff {
                    name: name.clone(),
                    first: first_nvr,
                    second: second_nvr,
                })
            })
        }))
        .try_buffer_unordered(self.concurrency)
        .try_collect()
        .await?;

        diffs.sort();
        Ok(diffs)
    }

    /// Run the name diff followed by the value diff
    pub async fn compare(&self) -> Result<ComparisonReport> {
        let names = self.name_diff().await?.clone();
        let nvrs = self.value_diff().await?;
        Ok(ComparisonReport { names, nvrs })
    }
}
