//! Policy decisions backed by OPA.
//!
//! Open a [`PolicyHandle`] on a compiled module, a bundle archive, or a bundle directory and
//! ask it for `allow`, `violations`, or a combined [`Decision`]. A [`PolicyRegistry`] keeps
//! several handles under logical names, optionally loaded from an index file.
//!
//! ```no_run
//! use governant::{BackendOptions, Mode, PolicyHandle};
//! use serde_json::json;
//!
//! let handle = PolicyHandle::open(
//!     "policies/deploy.wasm",
//!     "github.deploy",
//!     Mode::Auto,
//!     &BackendOptions::default(),
//! )?;
//! let decision = handle.decision(&json!({"environment": "production"}))?;
//! if decision.is_denied() {
//!     eprintln!("deploy blocked: {:?}", decision.violations);
//! }
//! # Ok::<(), governant::PolicyError>(())
//! ```

#![forbid(unsafe_code)]

pub use governant_domain::{ResultShape, classify, decide, to_boolean, to_list};
pub use governant_engine::{
    Artifact, ArtifactKind, Backend, BackendKind, BackendOptions, EMBEDDED_AVAILABLE, ErrorKind,
    PolicyError, PolicyHandle, PolicyRegistry, PolicyResult,
};
pub use governant_types::{Decision, Entrypoint, IndexEntry, Mode, PolicyIndex};
