use camino::Utf8PathBuf;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend selection for a policy.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Embedded for bare modules, external process for everything else. Falls back to the
    /// external process when the embedded runtime cannot be constructed.
    #[default]
    Auto,
    /// In-process sandboxed module execution. Never falls back.
    #[serde(alias = "wasm")]
    Embedded,
    /// `opa eval` subprocess. Never falls back.
    #[serde(alias = "cli")]
    External,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Embedded => "embedded",
            Mode::External => "external",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown mode: {} (expected auto|embedded|external)",
            self.0
        )
    }
}

impl std::error::Error for UnknownMode {}

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Mode::Auto),
            "embedded" | "wasm" => Ok(Mode::Embedded),
            "external" | "cli" => Ok(Mode::External),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// One registration record of a policy index file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IndexEntry {
    /// Logical policy name; unique within a registry.
    pub name: String,
    /// Module, bundle, or directory path. Relative paths resolve against the index file.
    #[schemars(with = "String")]
    pub artifact: Utf8PathBuf,
    /// Default package (e.g. `github.deploy`) whose `allow`/`violations` rules are queried.
    pub package: String,
    #[serde(default)]
    pub mode: Mode,
}

/// A policy index file: registration records applied in order.
pub type PolicyIndex = Vec<IndexEntry>;
