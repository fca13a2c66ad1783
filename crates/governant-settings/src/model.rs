use camino::Utf8PathBuf;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `governant.toml` schema v1.
///
/// Every key is optional; command-line flags and environment variables take precedence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GovernantConfigV1 {
    /// Policy index file (JSON array of registration records).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub index: Option<Utf8PathBuf>,

    /// Artifact for single-policy mode (used when no index is configured).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub artifact: Option<Utf8PathBuf>,

    /// Default package for single-policy mode, e.g. `github.deploy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,

    /// Policy name to select from the index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,

    /// Backend mode: `auto` (default), `embedded`, `external`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// External evaluation tool (name on `PATH` or a path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opa: Option<String>,

    /// Output format: `json` (default), `pretty`, `text`, `markdown`, `github`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}
