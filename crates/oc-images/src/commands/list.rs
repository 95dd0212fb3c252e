//! List command

use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use oc_images_core::{
    resolve_nvrs, BackendClient, Error, ImageCollection, ImageMetadata, Result as CoreResult,
};
use serde::Serialize;
use tracing::debug;

use super::Session;
use crate::cli::ListArgs;
use crate::output;

/// One listed image in `--json` output
#[derive(Debug, Serialize)]
struct ListEntry<'a> {
    name: &'a str,
    pullspec: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    nvr: Option<String>,
}

/// Which image names a listing includes
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection<'a> {
    All,
    Containing(&'a str),
    Exact(&'a [String]),
}

impl<'a> Selection<'a> {
    fn from_args(args: &'a ListArgs) -> Self {
        match (&args.filter, args.name.as_slice()) {
            (Some(filter), _) => Self::Containing(filter),
            (None, []) => Self::All,
            (None, names) => Self::Exact(names),
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Containing(filter) => name.contains(filter),
            Self::Exact(names) => names.iter().any(|n| n == name),
        }
    }
}

/// List the images of a collection, by NVR or by pullspec
pub async fn run(args: ListArgs, session: &Session) -> Result<()> {
    let collection = open_collection(&args, session.backend.clone())?;
    debug!("Listing {} ({})", collection.pointer(), collection.kind());

    let pb = output::spinner(
        &format!("Loading {}", collection.pointer()),
        session.progress && !args.json,
    );
    let selection = Selection::from_args(&args);
    let gathered = gather(
        &collection,
        &selection,
        Gather {
            operators_only: args.operators,
            resolve_nvrs: !args.pullspec,
            concurrency: session.config.concurrency,
        },
        &pb,
    )
    .await;
    pb.finish_and_clear();
    let (selected, nvrs) = gathered?;

    if args.json {
        let entries: Vec<ListEntry> = selected
            .iter()
            .enumerate()
            .map(|(i, image)| ListEntry {
                name: image.name(),
                pullspec: image.pullspec(),
                nvr: nvrs.as_ref().map(|n| n[i].clone()),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if selected.is_empty() {
        output::warning("No images matched");
        return Ok(());
    }

    match nvrs {
        Some(nvrs) => {
            for nvr in nvrs {
                println!("{}", nvr);
            }
        }
        None => {
            for image in selected {
                println!("{} {}", image.name(), image.pullspec());
            }
        }
    }

    Ok(())
}

/// The collection named by exactly one of the positional pointer or `--assembly`
fn open_collection(
    args: &ListArgs,
    backend: Arc<dyn BackendClient>,
) -> CoreResult<ImageCollection> {
    match (&args.collection, &args.assembly) {
        (None, Some(token)) => ImageCollection::from_assembly(token, backend),
        (Some(pointer), None) => Ok(ImageCollection::new(pointer.as_str(), backend)),
        (Some(_), Some(_)) => Err(Error::usage("a collection and --assembly cannot both be given")),
        (None, None) => Err(Error::usage("either a collection or --assembly is required")),
    }
}

/// What [`gather`] fetches beyond the collection itself
#[derive(Debug, Clone, Copy)]
struct Gather {
    operators_only: bool,
    resolve_nvrs: bool,
    concurrency: usize,
}

/// Load the collection, select images and resolve their NVRs when asked
async fn gather<'c>(
    collection: &'c ImageCollection,
    selection: &Selection<'_>,
    opts: Gather,
    pb: &ProgressBar,
) -> Result<(Vec<&'c ImageMetadata>, Option<Vec<String>>)> {
    let images = collection
        .images()
        .await
        .with_context(|| format!("Failed to load {}", collection.pointer()))?;

    let mut selected: Vec<&ImageMetadata> = images
        .iter()
        .filter(|image| selection.matches(image.name()))
        .collect();

    if opts.operators_only {
        pb.set_message("Finding release operators");
        let operators = collection
            .release_operator_images(opts.concurrency)
            .await
            .context("Failed to read release operator labels")?;
        selected.retain(|image| operators.contains(&image.name()));
    }

    if !opts.resolve_nvrs {
        return Ok((selected, None));
    }

    pb.set_message(format!("Resolving {} NVRs", selected.len()));
    let nvrs = resolve_nvrs(&selected, opts.concurrency)
        .await
        .context("Failed to resolve NVRs")?;
    Ok((selected, Some(nvrs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    const PAYLOAD: &str = "quay.io/openshift-release-dev/ocp-release:4.18.3-x86_64";

    /// Serves one payload whose `*-operator` images carry the release operator label
    struct PayloadBackend;

    #[async_trait]
    impl BackendClient for PayloadBackend {
        async fn fetch_payload_info(&self, pointer: &str) -> CoreResult<Value> {
            let tags: Vec<Value> = ["cli", "cluster-version-operator", "machine-config-operator"]
                .iter()
                .map(|name| json!({"name": name, "from": {"name": format!("quay.io/art/{}", name)}}))
                .collect();
            Ok(json!({"image": pointer, "references": {"spec": {"tags": tags}}}))
        }

        async fn fetch_imagestream_info(&self, namespace: &str, name: &str) -> CoreResult<Value> {
            Err(Error::backend(format!("get is {}/{}", namespace, name), "not served"))
        }

        async fn fetch_image_info(&self, pullspec: &str) -> CoreResult<Value> {
            let name = pullspec.trim_start_matches("quay.io/art/");
            let mut labels = json!({
                "com.redhat.component": format!("{}-container", name),
                "version": "v4.18.0",
                "release": "1",
            });
            if name.ends_with("-operator") {
                labels["io.openshift.release.operator"] = json!("true");
            }
            Ok(json!({"config": {"config": {"Labels": labels}}}))
        }
    }

    fn backend() -> Arc<dyn BackendClient> {
        Arc::new(PayloadBackend)
    }

    fn args(filter: Option<&str>, names: &[&str]) -> ListArgs {
        ListArgs {
            collection: Some("4.18-art-latest".to_string()),
            assembly: None,
            filter: filter.map(str::to_string),
            name: names.iter().map(|n| n.to_string()).collect(),
            pullspec: false,
            operators: false,
            json: false,
        }
    }

    fn opts(operators_only: bool, resolve_nvrs: bool) -> Gather {
        Gather {
            operators_only,
            resolve_nvrs,
            concurrency: 2,
        }
    }

    #[test]
    fn test_open_collection_from_pointer_or_assembly() {
        let collection = open_collection(&args(None, &[]), backend()).unwrap();
        assert_eq!(collection.pointer(), "4.18-art-latest");

        let mut by_assembly = args(None, &[]);
        by_assembly.collection = None;
        by_assembly.assembly = Some("4.17.3".to_string());
        let collection = open_collection(&by_assembly, backend()).unwrap();
        assert_eq!(collection.pointer(), "ocp/4.17-art-assembly-4.17.3");
    }

    #[test]
    fn test_open_collection_needs_exactly_one_source() {
        let mut neither = args(None, &[]);
        neither.collection = None;
        let err = open_collection(&neither, backend()).unwrap_err();
        assert!(err.is_usage());
        assert!(matches!(err, Error::Usage { .. }));

        let mut both = args(None, &[]);
        both.assembly = Some("4.17.3".to_string());
        assert!(matches!(
            open_collection(&both, backend()),
            Err(Error::Usage { .. })
        ));
    }

    #[test]
    fn test_open_collection_rejects_unknown_assembly() {
        let mut unknown = args(None, &[]);
        unknown.collection = None;
        unknown.assembly = Some("banana".to_string());
        let err = open_collection(&unknown, backend()).unwrap_err();
        assert_eq!(err, Error::unknown_assembly("banana"));
    }

    #[tokio::test]
    async fn test_gather_release_operators_only() {
        let collection = ImageCollection::new(PAYLOAD, backend());
        let pb = ProgressBar::hidden();

        let (selected, nvrs) = gather(&collection, &Selection::All, opts(true, true), &pb)
            .await
            .unwrap();

        let names: Vec<&str> = selected.iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["cluster-version-operator", "machine-config-operator"]);
        assert_eq!(
            nvrs.unwrap(),
            vec![
                "cluster-version-operator-container-v4.18.0-1",
                "machine-config-operator-container-v4.18.0-1",
            ]
        );
    }

    #[tokio::test]
    async fn test_gather_operators_intersects_selection() {
        let collection = ImageCollection::new(PAYLOAD, backend());
        let pb = ProgressBar::hidden();

        let (selected, nvrs) = gather(
            &collection,
            &Selection::Containing("machine"),
            opts(true, false),
            &pb,
        )
        .await
        .unwrap();

        let names: Vec<&str> = selected.iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["machine-config-operator"]);
        assert!(nvrs.is_none());
    }

    #[tokio::test]
    async fn test_gather_all_without_operator_filter() {
        let collection = ImageCollection::new(PAYLOAD, backend());
        let pb = ProgressBar::hidden();

        let (selected, nvrs) = gather(&collection, &Selection::All, opts(false, false), &pb)
            .await
            .unwrap();

        assert_eq!(selected.len(), 3);
        assert!(nvrs.is_none());
    }

    #[test]
    fn test_selection_all() {
        let args = args(None, &[]);
        let selection = Selection::from_args(&args);
        assert_eq!(selection, Selection::All);
        assert!(selection.matches("anything"));
    }

    #[test]
    fn test_selection_substring() {
        let args = args(Some("ovn"), &[]);
        let selection = Selection::from_args(&args);
        assert!(selection.matches("ovn-kubernetes"));
        assert!(selection.matches("ovn-kubernetes-microshift"));
        assert!(!selection.matches("ironic"));
    }

    #[test]
    fn test_selection_exact_names() {
        let args = args(None, &["ironic", "cli"]);
        let selection = Selection::from_args(&args);
        assert!(selection.matches("ironic"));
        assert!(selection.matches("cli"));
        assert!(!selection.matches("ironic-agent"));
        assert!(!selection.matches("cli-artifacts"));
    }

    #[test]
    fn test_list_entry_json_omits_missing_nvr() {
        let entry = ListEntry {
            name: "cli",
            pullspec: "quay.io/art@sha256:cli",
            nvr: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "cli", "pullspec": "quay.io/art@sha256:cli"})
        );
    }
}
