//! The query use cases: resolve config, open the policy, evaluate, and shape the report.

use anyhow::Context;
use governant_engine::{BackendOptions, PolicyError, PolicyHandle, PolicyRegistry, PolicyResult};
use governant_render::RenderableReport;
use governant_settings::{GovernantConfigV1, Overrides, PolicySource, ResolvedConfig};
use serde_json::Value;

/// What to ask the policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    /// `<package>.allow` as a boolean.
    Allow,
    /// `<package>.violations` as a list.
    Violations,
    /// Both, combined conjunctively.
    Decision,
    /// Any entrypoint, unprocessed.
    Evaluate { entrypoint: String },
}

/// How a query came out, for exit-code purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Allowed,
    Denied,
    ViolationsFound,
    /// A raw evaluation; never fails the process.
    Evaluated,
}

/// Input for the query use case.
#[derive(Clone, Debug)]
pub struct QueryInput<'a> {
    /// Config file contents (empty string if not found).
    pub config_text: &'a str,
    /// CLI and environment overrides.
    pub overrides: Overrides,
    /// The policy input document.
    pub input: Value,
    pub query: Query,
}

/// Output from the query use case.
#[derive(Clone, Debug)]
pub struct QueryOutput {
    pub report: RenderableReport,
    pub outcome: Outcome,
    /// The resolved configuration used.
    pub resolved_config: ResolvedConfig,
}

/// A registry plus the one policy selected from it.
#[derive(Debug)]
pub struct OpenPolicy {
    registry: PolicyRegistry,
    name: String,
}

impl OpenPolicy {
    pub fn handle(&self) -> PolicyResult<&PolicyHandle> {
        self.registry.get(&self.name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }
}

/// Parse config text (empty is allowed, defaults apply) and apply overrides.
///
/// Failures are reported as [`PolicyError::InvalidConfig`] so callers can classify them.
pub fn resolve(config_text: &str, overrides: Overrides) -> anyhow::Result<ResolvedConfig> {
    let cfg = if config_text.trim().is_empty() {
        GovernantConfigV1::default()
    } else {
        governant_settings::parse_config_toml(config_text)
            .map_err(invalid_config)
            .context("parse config")?
    };
    governant_settings::resolve_config(cfg, overrides)
        .map_err(invalid_config)
        .context("resolve config")
}

pub fn backend_options(resolved: &ResolvedConfig) -> BackendOptions {
    BackendOptions::with_opa(resolved.opa.clone())
}

/// Build the registry the config describes and select its policy.
pub fn open_policy(
    resolved: &ResolvedConfig,
    options: BackendOptions,
) -> anyhow::Result<OpenPolicy> {
    let mut registry = PolicyRegistry::new(options);
    let name = match &resolved.source {
        PolicySource::Index { path, policy, mode } => {
            registry
                .load_from_index_with_mode(path, *mode)
                .with_context(|| format!("load policy index {path}"))?;
            registry.get(policy)?;
            policy.clone()
        }
        PolicySource::Single {
            name,
            artifact,
            package,
            mode,
        } => {
            registry
                .register(name, artifact, package, *mode)
                .with_context(|| format!("open policy {artifact}"))?;
            name.clone()
        }
    };
    tracing::debug!(policy = %name, registered = registry.len(), "policy opened");
    Ok(OpenPolicy { registry, name })
}

/// Run `query` against an open policy.
pub fn evaluate_query(
    policy: &OpenPolicy,
    query: &Query,
    input: &Value,
) -> anyhow::Result<(RenderableReport, Outcome)> {
    let handle = policy.handle()?;
    let out = match query {
        Query::Allow => {
            let allow = handle.allow(input).context("evaluate allow")?;
            let outcome = if allow { Outcome::Allowed } else { Outcome::Denied };
            (RenderableReport::allow(allow), outcome)
        }
        Query::Violations => {
            let violations = handle.violations(input).context("evaluate violations")?;
            let outcome = if violations.is_empty() {
                Outcome::Allowed
            } else {
                Outcome::ViolationsFound
            };
            (RenderableReport::violations(&violations), outcome)
        }
        Query::Decision => {
            let decision = handle.decision(input).context("evaluate decision")?;
            let outcome = if decision.has_violations() {
                Outcome::ViolationsFound
            } else if decision.is_denied() {
                Outcome::Denied
            } else {
                Outcome::Allowed
            };
            (RenderableReport::decision(&decision), outcome)
        }
        Query::Evaluate { entrypoint } => {
            let value = handle
                .evaluate(entrypoint, input)
                .with_context(|| format!("evaluate {entrypoint}"))?;
            (RenderableReport::raw(value), Outcome::Evaluated)
        }
    };
    Ok(out)
}

/// Run the query use case: resolve config, open the policy, evaluate.
pub fn run_query(input: QueryInput<'_>) -> anyhow::Result<QueryOutput> {
    let resolved = resolve(input.config_text, input.overrides)?;
    let policy = open_policy(&resolved, backend_options(&resolved))?;
    let (report, outcome) = evaluate_query(&policy, &input.query, &input.input)?;
    Ok(QueryOutput {
        report,
        outcome,
        resolved_config: resolved,
    })
}

fn invalid_config(err: anyhow::Error) -> PolicyError {
    PolicyError::InvalidConfig {
        reason: format!("{err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_exit_code;
    use governant_settings::OutputFormat;

    #[test]
    fn config_errors_are_invalid_config() {
        let err = resolve("", Overrides::default()).expect_err("nothing configured");
        assert_eq!(error_exit_code(&err), 4);
        assert!(format!("{err:#}").contains("either --index or --artifact"), "{err:#}");

        let err = resolve("mode = [", Overrides::default()).expect_err("bad toml");
        assert_eq!(error_exit_code(&err), 4);
    }

    #[test]
    fn config_text_supplies_defaults() {
        let text = "artifact = \"p.wasm\"\npackage = \"github.deploy\"\nformat = \"text\"\n";
        let resolved = resolve(text, Overrides::default()).expect("resolve");
        assert_eq!(resolved.format, OutputFormat::Text);
        assert!(matches!(resolved.source, PolicySource::Single { .. }));
    }

    #[test]
    fn missing_artifact_is_not_an_invalid_config() {
        let overrides = Overrides {
            artifact: Some("/nonexistent/governant/policy.wasm".into()),
            package: Some("github.deploy".to_string()),
            ..Overrides::default()
        };
        let resolved = resolve("", overrides).expect("resolve");
        let err = open_policy(&resolved, backend_options(&resolved)).expect_err("missing");
        assert_eq!(error_exit_code(&err), 1);
        assert!(format!("{err:#}").contains("artifact not found"), "{err:#}");
    }
}
