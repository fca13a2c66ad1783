//! Shared test utilities for the governant workspace.
//!
//! This crate exists because the `fake-opa` binary needs the reference deploy policy at
//! runtime (not behind `#[cfg(test)]`), and because several crates' integration tests share
//! the same stub tools and fixture module.

pub mod deploy_policy;
pub mod stub_tool;
pub mod wasm_fixture;

use camino::Utf8PathBuf;
use std::path::PathBuf;

/// Workspace `tests/fixtures` directory.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("tests")
        .join("fixtures")
}

/// UTF-8 view of a temp dir, for APIs that take `camino` paths.
pub fn utf8_path(path: impl Into<PathBuf>) -> Utf8PathBuf {
    let path = path.into();
    Utf8PathBuf::from_path_buf(path).unwrap_or_else(|p| panic!("non-UTF-8 path: {}", p.display()))
}
