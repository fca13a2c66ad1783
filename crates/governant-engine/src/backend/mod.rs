//! Evaluation backends and the selection policy between them.

use camino::Utf8PathBuf;
use governant_types::{Entrypoint, Mode};
use serde_json::Value;
use std::fmt;

use crate::artifact::{Artifact, ArtifactKind};
use crate::error::PolicyResult;

mod embedded;
mod external;

pub use embedded::{EMBEDDED_AVAILABLE, EmbeddedBackend};
pub use external::ExternalBackend;

/// Construction parameters shared by every backend a registry builds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendOptions {
    /// External evaluation tool: a name resolved on `PATH`, or a path.
    pub opa: String,
    /// Directory for per-call temporary files; the system temp directory when unset.
    pub scratch_dir: Option<Utf8PathBuf>,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            opa: "opa".to_string(),
            scratch_dir: None,
        }
    }
}

impl BackendOptions {
    pub fn with_opa(opa: impl Into<String>) -> Self {
        Self {
            opa: opa.into(),
            ..Self::default()
        }
    }
}

/// Executes one entrypoint against one input document.
///
/// Implementations are built once per artifact and reused across calls.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Evaluate `entrypoint` (already normalized) and return the unprocessed result.
    fn evaluate(&self, entrypoint: &Entrypoint, input: &Value) -> PolicyResult<Value>;

    fn kind(&self) -> BackendKind;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Embedded,
    External,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Embedded => "embedded",
            BackendKind::External => "external",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the backend for `artifact` according to `mode`.
///
/// `auto` prefers the embedded backend for bare modules and falls back to the external tool
/// when it cannot be constructed. Explicit modes never fall back.
pub fn select_backend(
    artifact: &Artifact,
    mode: Mode,
    options: &BackendOptions,
) -> PolicyResult<Box<dyn Backend>> {
    match mode {
        Mode::Embedded => Ok(Box::new(EmbeddedBackend::new(artifact)?)),
        Mode::External => Ok(Box::new(ExternalBackend::new(artifact, options)?)),
        Mode::Auto if artifact.kind() == ArtifactKind::Module => {
            match EmbeddedBackend::new(artifact) {
                Ok(backend) => Ok(Box::new(backend)),
                Err(err) => {
                    tracing::warn!(
                        artifact = %artifact.path(),
                        error = %err,
                        "embedded backend unavailable, falling back to external tool"
                    );
                    Ok(Box::new(ExternalBackend::new(artifact, options)?))
                }
            }
        }
        Mode::Auto => Ok(Box::new(ExternalBackend::new(artifact, options)?)),
    }
}
