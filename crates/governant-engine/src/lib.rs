//! Decision client core: artifact resolution, evaluation backends, policy handles, and the
//! policy registry.
//!
//! A [`PolicyHandle`] binds one artifact to one backend for its whole lifetime; a
//! [`PolicyRegistry`] maps logical names to handles.

#![forbid(unsafe_code)]

mod artifact;
mod backend;
mod bundle;
mod error;
mod handle;
mod registry;
mod scratch;

pub use artifact::{Artifact, ArtifactKind, BundleTarget, resolve_bundle_target};
pub use backend::{
    Backend, BackendKind, BackendOptions, EMBEDDED_AVAILABLE, EmbeddedBackend, ExternalBackend,
    select_backend,
};
pub use bundle::{read_module_bytes, wrap_as_bundle};
pub use error::{ErrorKind, PolicyError, PolicyResult};
pub use handle::PolicyHandle;
pub use registry::{PolicyRegistry, parse_index};
pub use scratch::ScratchFile;
