//! Collection name resolution
//!
//! Pure string logic that decides whether a user-supplied pointer names a
//! release payload or an imagestream, and turns imagestream pointers and
//! assembly shorthands into namespace/name coordinates. Nothing here touches
//! the network.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Pointer prefixes that denote a release payload
const PAYLOAD_PREFIXES: &[&str] = &["quay.io", "registry.ci.openshift.org/ocp/release"];

/// Namespace holding the x86_64 ART imagestreams
const DEFAULT_NAMESPACE: &str = "ocp";

/// Sentinel used when a pointer cannot be resolved to an imagestream
pub const UNRESOLVED: &str = "noname";

/// Architecture suffixes told apart from an art assembly's own suffix
const ARCH_ALTERNATION: &str = "x86_64|amd64|aarch64|arm64|ppc64le|s390x|multi";

static PATCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<version>\d+\.\d+)\.(?P<patch>.+)$").expect("patch regex is valid")
});

static ASSEMBLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<version>\d+\.\d+)-(?P<assembly>ec\.\d+|rc\.\d+|(?:art-)?(?:latest|nightly|stream))(?P<arch>-[A-Za-z0-9_]+)?$",
    )
    .expect("assembly regex is valid")
});

// `art123-hotfix` may carry its own suffix, so only known arches bind to `arch`
static ART_ASSEMBLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<version>\d+\.\d+)-(?P<assembly>art\d+(?:-[a-z0-9.]+)??)(?P<arch>-(?:{ARCH_ALTERNATION}))?$"
    ))
    .expect("art assembly regex is valid")
});

static QUALIFIED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^\d+\.\d+-art-assembly-.+?(?P<arch>-(?:{ARCH_ALTERNATION}))?$"
    ))
    .expect("qualified imagestream regex is valid")
});

static TOKEN_RELEASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<ystream>\d+\.\d+)\.(?P<z>\d+)$").expect("release token regex is valid")
});

static TOKEN_CANDIDATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<ystream>\d+\.\d+)(?:\.\d+)?-(?P<qualifier>(?:ec|rc)\.\d+)$")
        .expect("candidate token regex is valid")
});

static TOKEN_ART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<ystream>\d+\.\d+)-(?P<qualifier>art\d+(?:-[a-z0-9.]+)?)$")
        .expect("art token regex is valid")
});

static TOKEN_LATEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<ystream>\d+\.\d+)-(?:art-)?(?:latest|nightly|stream)$")
        .expect("latest token regex is valid")
});

/// What a collection pointer refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// A release payload image
    Payload,
    /// A namespaced imagestream
    Imagestream,
}

impl CollectionKind {
    /// Classify a pointer by prefix only
    pub fn classify(pointer: &str) -> Self {
        if PAYLOAD_PREFIXES.iter().any(|p| pointer.starts_with(p)) {
            Self::Payload
        } else {
            Self::Imagestream
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payload => write!(f, "payload"),
            Self::Imagestream => write!(f, "imagestream"),
        }
    }
}

/// Namespace and name of an imagestream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub namespace: String,
    pub name: String,
}

impl Coordinates {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// The sentinel returned for pointers no rule recognises
    pub fn unresolved() -> Self {
        Self::new(UNRESOLVED, UNRESOLVED)
    }

    pub fn is_unresolved(&self) -> bool {
        self.namespace == UNRESOLVED && self.name == UNRESOLVED
    }

    /// Resolve imagestream coordinates from a pointer
    ///
    /// Rules are tried in order and the first match wins:
    /// 1. `namespace/name` is taken verbatim
    /// 2. `4.18.5`, `4.18.rc.3`, `4.18.0-rc.10` become assembly imagestreams in `ocp`
    /// 3. `4.18-rc.10`, `4.17-art123`, `4.19-art-latest-s390x` shorthands, where a
    ///    trailing `-<suffix>` selects the `ocp-<suffix>` namespace
    /// 4. already qualified `4.18-art-assembly-...` names, namespaced by arch
    /// 5. anything else yields the `noname/noname` sentinel
    pub fn from_pointer(pointer: &str) -> Self {
        let coordinates = if let Some((namespace, name)) = pointer.split_once('/') {
            Self::new(namespace, name)
        } else if let Some(caps) = PATCH_RE.captures(pointer) {
            Self::from_patch(&caps)
        } else if let Some(caps) = ASSEMBLY_RE
            .captures(pointer)
            .or_else(|| ART_ASSEMBLY_RE.captures(pointer))
        {
            Self::from_assembly(&caps)
        } else if let Some(caps) = QUALIFIED_RE.captures(pointer) {
            let arch = caps.name("arch").map_or("", |m| m.as_str());
            Self::new(format!("{DEFAULT_NAMESPACE}{arch}"), pointer)
        } else {
            Self::unresolved()
        };

        debug!("Resolved pointer '{}' to {}", pointer, coordinates);
        coordinates
    }

    fn from_patch(caps: &Captures<'_>) -> Self {
        let version = &caps["version"];
        let patch = &caps["patch"];
        let name = if patch.contains("ec") || patch.contains("rc") {
            format!("{version}-art-assembly-{patch}")
        } else {
            format!("{version}-art-assembly-{version}.{patch}")
        };
        Self::new(DEFAULT_NAMESPACE, name)
    }

    fn from_assembly(caps: &Captures<'_>) -> Self {
        let version = &caps["version"];
        let assembly = &caps["assembly"];
        let arch = caps.name("arch").map_or("", |m| m.as_str());

        let name = if is_latest(assembly) {
            format!("{version}-art-latest{arch}")
        } else {
            format!("{version}-art-assembly-{assembly}{arch}")
        };
        Self::new(format!("{DEFAULT_NAMESPACE}{arch}"), name)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

fn is_latest(assembly: &str) -> bool {
    matches!(
        assembly.strip_prefix("art-").unwrap_or(assembly),
        "latest" | "nightly" | "stream"
    )
}

/// Map a bare assembly token to a fully qualified `ocp/...` imagestream name
///
/// # Errors
/// Returns [`Error::UnknownAssembly`] when the token matches no known form.
pub fn assembly_to_imagestream(token: &str) -> Result<String> {
    let imagestream = if let Some(caps) = TOKEN_RELEASE_RE.captures(token) {
        let ystream = &caps["ystream"];
        format!("{DEFAULT_NAMESPACE}/{ystream}-art-assembly-{ystream}.{}", &caps["z"])
    } else if let Some(caps) = TOKEN_CANDIDATE_RE
        .captures(token)
        .or_else(|| TOKEN_ART_RE.captures(token))
    {
        format!(
            "{DEFAULT_NAMESPACE}/{}-art-assembly-{}",
            &caps["ystream"], &caps["qualifier"]
        )
    } else if let Some(caps) = TOKEN_LATEST_RE.captures(token) {
        format!("{DEFAULT_NAMESPACE}/{}-art-latest", &caps["ystream"])
    } else {
        return Err(Error::unknown_assembly(token));
    };

    debug!("Assembly '{}' maps to imagestream {}", token, imagestream);
    Ok(imagestream)
}
