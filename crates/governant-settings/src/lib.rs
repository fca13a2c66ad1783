//! Config parsing and override resolution.
//!
//! This crate is intentionally IO-free: it parses and resolves configuration provided as strings.
//! Precedence is flag > environment > config file > default; flags and environment are merged
//! by the caller into [`Overrides`].

#![forbid(unsafe_code)]

mod model;
mod resolve;

pub use model::GovernantConfigV1;
pub use resolve::{
    DEFAULT_OPA_TOOL, DEFAULT_POLICY_NAME, OutputFormat, Overrides, PolicySource, ResolvedConfig,
};

/// Parse `governant.toml` (or equivalent) into a typed model.
pub fn parse_config_toml(input: &str) -> anyhow::Result<GovernantConfigV1> {
    let cfg: GovernantConfigV1 = toml::from_str(input)?;
    Ok(cfg)
}

/// Resolve the effective config: which policy to load, how, and how to print the result.
pub fn resolve_config(
    cfg: GovernantConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    resolve::resolve_config(cfg, overrides)
}
