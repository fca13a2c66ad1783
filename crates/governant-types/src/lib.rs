//! Stable DTOs and IDs used across the governant workspace.
//!
//! This crate is intentionally boring:
//! - the canonical decision document
//! - entrypoint normalization
//! - registry index records and backend modes
//! - stable string IDs and exit codes

#![forbid(unsafe_code)]

pub mod decision;
pub mod entrypoint;
pub mod ids;
pub mod index;

pub use decision::Decision;
pub use entrypoint::Entrypoint;
pub use index::{IndexEntry, Mode, PolicyIndex};
