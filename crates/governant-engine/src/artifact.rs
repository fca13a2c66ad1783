//! Artifact classification and bundle-target discovery.

use camino::{Utf8Path, Utf8PathBuf};
use governant_types::ids::{BUNDLE_MANIFEST, BUNDLE_MODULE_ENTRY};
use std::fmt;

use crate::error::{PolicyError, PolicyResult};

pub(crate) const BUNDLE_SUFFIXES: [&str; 3] = [".tar.gz", ".tgz", ".tar"];
pub(crate) const MODULE_SUFFIX: &str = ".wasm";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A single compiled module (`.wasm`).
    Module,
    /// A bundle archive (`.tar.gz`, `.tgz`, `.tar`).
    Bundle,
    /// A bundle laid out as a directory.
    Directory,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Module => "module",
            ArtifactKind::Bundle => "bundle",
            ArtifactKind::Directory => "directory",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled policy logic on disk. Existence is checked when the value is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    path: Utf8PathBuf,
    kind: ArtifactKind,
}

impl Artifact {
    /// Verify `path` exists and classify it.
    pub fn resolve(path: impl AsRef<Utf8Path>) -> PolicyResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PolicyError::ArtifactNotFound(path.to_path_buf()));
        }
        let kind = if path.is_dir() {
            ArtifactKind::Directory
        } else {
            kind_from_name(path)
        };
        Ok(Self {
            path: path.to_path_buf(),
            kind,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }
}

/// Classify a file by name. Unrecognized suffixes are treated as bundles and left for the
/// evaluation tool to reject.
fn kind_from_name(path: &Utf8Path) -> ArtifactKind {
    let name = path.as_str();
    if has_bundle_suffix(name) {
        ArtifactKind::Bundle
    } else if name.ends_with(MODULE_SUFFIX) {
        ArtifactKind::Module
    } else {
        ArtifactKind::Bundle
    }
}

fn has_bundle_suffix(name: &str) -> bool {
    BUNDLE_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// What the external tool should receive as `--bundle`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BundleTarget {
    /// An archive or directory usable as-is.
    Existing(Utf8PathBuf),
    /// A bare module that has to be wrapped into a temporary bundle per call.
    WrapModule(Utf8PathBuf),
}

/// Find the bundle the external tool should load for `path`.
///
/// Non-module paths are used as-is. For a bare module, in order:
/// 1. a sibling archive with the same base name (`policy.wasm` -> `policy.tar.gz`)
/// 2. the parent directory, if it carries a bundle marker (`.manifest` or `policy.wasm`)
/// 3. the module itself, to be wrapped
pub fn resolve_bundle_target(path: &Utf8Path) -> BundleTarget {
    let Some(stem) = path.as_str().strip_suffix(MODULE_SUFFIX) else {
        return BundleTarget::Existing(path.to_path_buf());
    };
    if path.is_dir() {
        return BundleTarget::Existing(path.to_path_buf());
    }

    for suffix in BUNDLE_SUFFIXES {
        let sibling = Utf8PathBuf::from(format!("{stem}{suffix}"));
        if sibling.is_file() {
            return BundleTarget::Existing(sibling);
        }
    }

    let parent = match path.parent() {
        Some(p) if !p.as_str().is_empty() => p,
        _ => Utf8Path::new("."),
    };
    if parent.join(BUNDLE_MANIFEST).is_file() || parent.join(BUNDLE_MODULE_ENTRY).is_file() {
        return BundleTarget::Existing(parent.to_path_buf());
    }

    BundleTarget::WrapModule(path.to_path_buf())
}
