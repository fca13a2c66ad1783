//! Use case orchestration for governant.
//!
//! This crate provides the application layer: use cases that coordinate settings, the engine,
//! and the renderers. It is intentionally thin and delegates heavy lifting to those layers.
//!
//! The CLI crate depends on this; it only handles argument parsing and I/O.

#![forbid(unsafe_code)]

mod event;
mod exit;
mod input;
mod query;
mod render;

pub use event::{
    DEFAULT_ENVIRONMENTS, DEFAULT_TICKET_PATTERN, EventInput, build_policy_input, run_event,
};
pub use exit::{error_exit_code, outcome_exit_code};
pub use input::{parse_input_document, parse_json_document};
pub use query::{
    OpenPolicy, Outcome, Query, QueryInput, QueryOutput, backend_options, evaluate_query,
    open_policy, resolve, run_query,
};
pub use render::render;
