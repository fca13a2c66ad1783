//! Rendering utilities for decision output (JSON, plain text, Markdown, GitHub annotations).

#![forbid(unsafe_code)]

mod gha;
mod json;
mod markdown;
mod model;
mod text;

pub use gha::render_github_annotations;
pub use json::{render_json, render_json_pretty, to_json};
pub use markdown::render_markdown;
pub use model::{RenderableReport, RenderableVerdict, RenderableViolation};
pub use text::render_text;
