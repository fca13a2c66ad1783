use camino::Utf8Path;
use governant_domain::{to_boolean, to_list};
use governant_types::ids::{RULE_ALLOW, RULE_VIOLATIONS};
use governant_types::{Decision, Entrypoint, Mode};
use serde_json::Value;

use crate::artifact::Artifact;
use crate::backend::{Backend, BackendKind, BackendOptions, select_backend};
use crate::error::PolicyResult;

/// One artifact, one default package, one backend resolved at construction.
#[derive(Debug)]
pub struct PolicyHandle {
    artifact: Artifact,
    package: String,
    backend: Box<dyn Backend>,
}

impl PolicyHandle {
    /// Resolve the artifact and build its backend. Fails fast on a missing artifact or an
    /// unusable backend.
    pub fn open(
        artifact: impl AsRef<Utf8Path>,
        package: impl Into<String>,
        mode: Mode,
        options: &BackendOptions,
    ) -> PolicyResult<Self> {
        let artifact = Artifact::resolve(artifact)?;
        let backend = select_backend(&artifact, mode, options)?;
        let package = package.into();
        tracing::debug!(
            artifact = %artifact.path(),
            kind = %artifact.kind(),
            package = %package,
            backend = %backend.kind(),
            "policy handle ready"
        );
        Ok(Self::with_backend(artifact, package, backend))
    }

    /// Bind an already constructed backend.
    pub fn with_backend(
        artifact: Artifact,
        package: impl Into<String>,
        backend: Box<dyn Backend>,
    ) -> Self {
        Self {
            artifact,
            package: package.into(),
            backend,
        }
    }

    /// Evaluate any entrypoint; the result is returned unprocessed.
    pub fn evaluate(&self, entrypoint: &str, input: &Value) -> PolicyResult<Value> {
        self.backend.evaluate(&Entrypoint::new(entrypoint), input)
    }

    /// `<package>.allow`, coerced to a boolean.
    pub fn allow(&self, input: &Value) -> PolicyResult<bool> {
        let raw = self.backend.evaluate(&self.rule(RULE_ALLOW), input)?;
        Ok(to_boolean(&raw))
    }

    /// `<package>.violations`, coerced to an ordered list.
    pub fn violations(&self, input: &Value) -> PolicyResult<Vec<Value>> {
        let raw = self.backend.evaluate(&self.rule(RULE_VIOLATIONS), input)?;
        Ok(to_list(&raw))
    }

    /// Both rules combined; allows only when `allow` holds and no violations remain.
    pub fn decision(&self, input: &Value) -> PolicyResult<Decision> {
        let allow = self.allow(input)?;
        let violations = self.violations(input)?;
        Ok(Decision::conjunctive(allow, violations))
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    fn rule(&self, rule: &str) -> Entrypoint {
        Entrypoint::rule(&self.package, rule)
    }
}
