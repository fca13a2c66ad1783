//! `opa eval` subprocess backend.

use governant_domain::unwrap_eval_output;
use governant_types::Entrypoint;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::{Backend, BackendKind, BackendOptions};
use crate::artifact::{Artifact, ArtifactKind, BundleTarget, resolve_bundle_target};
use crate::bundle::wrap_as_bundle;
use crate::error::{PolicyError, PolicyResult};
use crate::scratch::{INPUT_PREFIX, ScratchFile};
use camino::Utf8PathBuf;

/// Runs `<tool> eval --format json --bundle <bundle> -i <input.json> <entrypoint>` per call.
///
/// The input document (and a wrapped bundle, for bare modules) are written to uniquely named
/// temporary files that are removed before `evaluate` returns, on every exit path.
#[derive(Debug)]
pub struct ExternalBackend {
    tool_name: String,
    tool: PathBuf,
    target: BundleTarget,
    scratch_dir: Option<Utf8PathBuf>,
}

impl ExternalBackend {
    /// Resolve the tool on `PATH` and settle which bundle it will load.
    pub fn new(artifact: &Artifact, options: &BackendOptions) -> PolicyResult<Self> {
        let tool = which::which(&options.opa).map_err(|source| PolicyError::ToolNotFound {
            tool: options.opa.clone(),
            source,
        })?;
        let target = match artifact.kind() {
            ArtifactKind::Module => resolve_bundle_target(artifact.path()),
            ArtifactKind::Bundle | ArtifactKind::Directory => {
                BundleTarget::Existing(artifact.path().to_path_buf())
            }
        };
        tracing::debug!(tool = %tool.display(), target = ?target, "external backend ready");
        Ok(Self {
            tool_name: options.opa.clone(),
            tool,
            target,
            scratch_dir: options.scratch_dir.clone(),
        })
    }

    pub fn tool(&self) -> &Path {
        &self.tool
    }

    pub fn target(&self) -> &BundleTarget {
        &self.target
    }

    fn run(&self, bundle: &Path, input: &Path, entrypoint: &Entrypoint) -> PolicyResult<Output> {
        tracing::debug!(
            tool = %self.tool.display(),
            bundle = %bundle.display(),
            entrypoint = %entrypoint,
            "invoking evaluation tool"
        );
        Command::new(&self.tool)
            .args(["eval", "--format", "json", "--bundle"])
            .arg(bundle)
            .arg("-i")
            .arg(input)
            .arg(entrypoint.as_str())
            .output()
            .map_err(|e| PolicyError::io(format!("spawn {}", self.tool_name), e))
    }
}

impl Backend for ExternalBackend {
    fn evaluate(&self, entrypoint: &Entrypoint, input: &Value) -> PolicyResult<Value> {
        let body = serde_json::to_vec(input).map_err(|e| PolicyError::InvalidInput {
            reason: e.to_string(),
        })?;
        let dir = self.scratch_dir.as_deref().map(|d| d.as_std_path());

        let input_file = ScratchFile::write(INPUT_PREFIX, ".json", dir, &body)?;
        let wrapped = match &self.target {
            BundleTarget::WrapModule(module) => Some(wrap_as_bundle(module, dir)?),
            BundleTarget::Existing(_) => None,
        };
        let bundle = match (&wrapped, &self.target) {
            (Some(scratch), _) => scratch.path(),
            (None, BundleTarget::Existing(path) | BundleTarget::WrapModule(path)) => {
                path.as_std_path()
            }
        };

        let output = self.run(bundle, input_file.path(), entrypoint)?;
        if !output.status.success() {
            return Err(PolicyError::ProcessError {
                tool: self.tool_name.clone(),
                status: output.status.to_string(),
                diagnostic: diagnostic(&output),
            });
        }
        parse_output(&output.stdout)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::External
    }
}

/// Parse the tool's stdout and strip its query envelope. Empty output is undefined.
pub(crate) fn parse_output(stdout: &[u8]) -> PolicyResult<Value> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() {
        return Ok(Value::Null);
    }
    let parsed: Value =
        serde_json::from_str(text).map_err(|e| PolicyError::MalformedOutput {
            reason: format!("{e}: {}", truncate(text, 200)),
        })?;
    Ok(unwrap_eval_output(parsed))
}

/// Best diagnostic for a failed run: structured `errors[].message` on stdout, then stderr,
/// then raw stdout, then the exit status.
fn diagnostic(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = stdout.trim();
    let stderr = stderr.trim();

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(stdout)
        && let Some(Value::Array(errors)) = map.get("errors")
    {
        let messages: Vec<String> = errors
            .iter()
            .map(|e| match e.get("message").and_then(Value::as_str) {
                Some(m) => m.to_string(),
                None => e.to_string(),
            })
            .collect();
        if !messages.is_empty() {
            return messages.join(", ");
        }
    }
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    if !stdout.is_empty() {
        return stdout.to_string();
    }
    match output.status.code() {
        Some(code) => format!("exited with status {code}"),
        None => format!("terminated ({})", output.status),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
