//! Pure result normalization (no IO).
//!
//! Input: whatever an evaluation backend produced for one entrypoint.
//! Output: a canonical boolean, an ordered list, or a [`Decision`](governant_types::Decision).

#![forbid(unsafe_code)]

mod normalize;
pub mod shape;

pub use normalize::{decide, to_boolean, to_list, truthy, unwrap_eval_output};
pub use shape::{ResultShape, classify};

#[cfg(test)]
mod proptest;
