use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::DATA_ROOT;

/// Fully-qualified rule name in canonical dot form, always rooted at `data`.
///
/// Normalization rules:
/// - `/` and `.` are equivalent separators
/// - segments are trimmed; blank segments are dropped (`a..b`, `a. .b`, leading/trailing
///   separators)
/// - a leading `data` segment is added when missing
///
/// Normalizing an already normalized value is a no-op.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(from = "String", into = "String")]
pub struct Entrypoint(String);

impl Entrypoint {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        let raw = s.as_ref().replace('/', ".");
        let mut segments: Vec<&str> = raw
            .split('.')
            .map(str::trim)
            .filter(|seg| !seg.is_empty())
            .collect();
        if segments.first() != Some(&DATA_ROOT) {
            segments.insert(0, DATA_ROOT);
        }
        Self(segments.join("."))
    }

    /// Rule `rule` inside `package` (e.g. `github.deploy` + `allow`).
    pub fn rule(package: &str, rule: &str) -> Self {
        Self::new(format!("{package}.{rule}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Segments after the `data` root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').skip(1)
    }

    /// Slash form without the `data` root, as compiled module entrypoint tables key it
    /// (`data.github.deploy.allow` -> `github/deploy/allow`).
    pub fn as_module_path(&self) -> String {
        self.segments().collect::<Vec<_>>().join("/")
    }
}

impl fmt::Display for Entrypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Entrypoint {
    fn from(value: String) -> Self {
        Entrypoint::new(value)
    }
}

impl From<&str> for Entrypoint {
    fn from(value: &str) -> Self {
        Entrypoint::new(value)
    }
}

impl From<Entrypoint> for String {
    fn from(value: Entrypoint) -> Self {
        value.0
    }
}
