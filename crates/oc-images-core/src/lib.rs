//! Image collection engine for oc-images
//!
//! This crate provides functionality for:
//! - Classifying a collection pointer as a release payload or an imagestream
//! - Resolving imagestream coordinates and assembly shorthands
//! - Loading the images of a collection and their labels through an
//!   inspection backend (the `oc` CLI by default)
//! - Comparing two collections by image name and by pullspec
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use oc_images_core::{Comparer, Config, OcBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let backend = Arc::new(OcBackend::from_config(&config)?);
//!
//!     let comparer = Comparer::from_pointers(
//!         "quay.io/openshift-release-dev/ocp-release:4.18.2-x86_64",
//!         "4.18-art-assembly-4.18.3",
//!         backend,
//!     );
//!     for diff in comparer.value_diff().await? {
//!         println!("{}: {} -> {}", diff.name, diff.first, diff.second);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod collection;
pub mod comparer;
pub mod config;
pub mod error;
pub mod image;
pub mod resolver;
pub mod types;

// Re-export main types for convenience
pub use backend::{BackendClient, OcBackend};
pub use collection::{resolve_nvrs, ImageCollection, ImageMap};
pub use comparer::{Comparer, ComparisonReport, NameDiff, NvrDiff};
pub use config::Config;
pub use error::{Error, Result};
pub use image::{ImageLabels, ImageMetadata};
pub use resolver::{assembly_to_imagestream, CollectionKind, Coordinates};

/// Version of the oc-images-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
