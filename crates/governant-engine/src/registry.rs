use camino::{Utf8Path, Utf8PathBuf};
use governant_types::{Decision, Mode, PolicyIndex};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::backend::BackendOptions;
use crate::error::{PolicyError, PolicyResult};
use crate::handle::PolicyHandle;

/// Named policy handles for one process.
///
/// Populate once at startup, then read. Names are never overwritten.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    options: BackendOptions,
    handles: BTreeMap<String, PolicyHandle>,
}

impl PolicyRegistry {
    pub fn new(options: BackendOptions) -> Self {
        Self {
            options,
            handles: BTreeMap::new(),
        }
    }

    /// Build a handle and bind it to `name`.
    ///
    /// The name is checked before anything is constructed, so a duplicate leaves the registry
    /// untouched.
    pub fn register(
        &mut self,
        name: &str,
        artifact: impl AsRef<Utf8Path>,
        package: &str,
        mode: Mode,
    ) -> PolicyResult<&PolicyHandle> {
        if self.handles.contains_key(name) {
            return Err(PolicyError::DuplicateName(name.to_string()));
        }
        let handle = PolicyHandle::open(artifact, package, mode, &self.options)?;
        tracing::debug!(policy = name, backend = %handle.backend_kind(), "policy registered");
        Ok(self.handles.entry(name.to_string()).or_insert(handle))
    }

    /// Bind an already built handle.
    pub fn insert(&mut self, name: &str, handle: PolicyHandle) -> PolicyResult<()> {
        if self.handles.contains_key(name) {
            return Err(PolicyError::DuplicateName(name.to_string()));
        }
        self.handles.insert(name.to_string(), handle);
        Ok(())
    }

    /// Register every record of an index file, in order. Returns how many were registered.
    pub fn load_from_index(&mut self, path: &Utf8Path) -> PolicyResult<usize> {
        self.load_from_index_with_mode(path, None)
    }

    /// Like [`load_from_index`](Self::load_from_index), optionally forcing one mode onto every
    /// record.
    pub fn load_from_index_with_mode(
        &mut self,
        path: &Utf8Path,
        mode: Option<Mode>,
    ) -> PolicyResult<usize> {
        let text = std::fs::read_to_string(path).map_err(|e| PolicyError::InvalidIndex {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let entries = parse_index(&text).map_err(|reason| PolicyError::InvalidIndex {
            path: path.to_path_buf(),
            reason,
        })?;
        let base = path.parent().unwrap_or(Utf8Path::new(""));

        for entry in &entries {
            let artifact = resolve_relative(base, &entry.artifact);
            self.register(
                &entry.name,
                &artifact,
                &entry.package,
                mode.unwrap_or(entry.mode),
            )?;
        }
        tracing::debug!(index = %path, policies = entries.len(), "policy index loaded");
        Ok(entries.len())
    }

    pub fn get(&self, name: &str) -> PolicyResult<&PolicyHandle> {
        self.handles
            .get(name)
            .ok_or_else(|| PolicyError::PolicyNotFound(name.to_string()))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn allow(&self, name: &str, input: &Value) -> PolicyResult<bool> {
        self.get(name)?.allow(input)
    }

    pub fn violations(&self, name: &str, input: &Value) -> PolicyResult<Vec<Value>> {
        self.get(name)?.violations(input)
    }

    pub fn decision(&self, name: &str, input: &Value) -> PolicyResult<Decision> {
        self.get(name)?.decision(input)
    }

    pub fn evaluate(&self, name: &str, entrypoint: &str, input: &Value) -> PolicyResult<Value> {
        self.get(name)?.evaluate(entrypoint, input)
    }
}

/// Parse index text into records. The error is a human-readable reason.
pub fn parse_index(text: &str) -> Result<PolicyIndex, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    if !value.is_array() {
        return Err("index must be a JSON array of policy records".to_string());
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn resolve_relative(base: &Utf8Path, artifact: &Utf8Path) -> Utf8PathBuf {
    if artifact.is_absolute() || base.as_str().is_empty() {
        artifact.to_path_buf()
    } else {
        base.join(artifact)
    }
}
