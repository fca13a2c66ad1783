//! Error taxonomy for artifact resolution, evaluation, and registration.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Failure raised anywhere between resolving an artifact and returning a raw result.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The artifact path does not exist.
    #[error("artifact not found: {0}")]
    ArtifactNotFound(Utf8PathBuf),

    /// The sandbox runtime cannot be used.
    #[error("backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    /// The external evaluation tool is not on the resolution path.
    #[error("evaluation tool not found: {tool}")]
    ToolNotFound {
        tool: String,
        #[source]
        source: which::Error,
    },

    /// The compiled module lacks a function the embedded backend calls.
    #[error("module is missing required export: {0}")]
    MissingExport(&'static str),

    /// The compiled module could not be compiled, linked, or instantiated.
    #[error("malformed module: {reason}")]
    MalformedModule { reason: String },

    /// The engine aborted or trapped during evaluation.
    #[error("evaluation failed: {reason}")]
    EvalFailed { reason: String },

    /// The entrypoint is not compiled into the module.
    #[error("unknown entrypoint: {0}")]
    UnknownEntrypoint(String),

    /// The evaluation tool exited non-zero.
    #[error("{tool} failed with {status}: {diagnostic}")]
    ProcessError {
        tool: String,
        status: String,
        diagnostic: String,
    },

    /// The backend output could not be parsed at all.
    #[error("malformed backend output: {reason}")]
    MalformedOutput { reason: String },

    #[error("policy already registered: {0}")]
    DuplicateName(String),

    #[error("policy not registered: {0}")]
    PolicyNotFound(String),

    /// The index file is missing or is not a list of well-formed records.
    #[error("invalid policy index {path}: {reason}")]
    InvalidIndex { path: Utf8PathBuf, reason: String },

    /// A caller-supplied document is not valid JSON.
    #[error("invalid input document: {reason}")]
    InvalidInput { reason: String },

    /// Configuration could not be resolved.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Reading or writing an archive failed.
    #[error("bundle error at {path}: {source}")]
    Bundle {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PolicyResult<T> = Result<T, PolicyError>;

/// Coarse classification used for exit codes and logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input document, configuration, or index.
    Invalid,
    /// Runtime or tool missing.
    Unavailable,
    /// Everything that went wrong while resolving or evaluating.
    Evaluation,
}

impl PolicyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PolicyError::InvalidIndex { .. }
            | PolicyError::InvalidInput { .. }
            | PolicyError::InvalidConfig { .. } => ErrorKind::Invalid,
            PolicyError::BackendUnavailable { .. } | PolicyError::ToolNotFound { .. } => {
                ErrorKind::Unavailable
            }
            _ => ErrorKind::Evaluation,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PolicyError::Io {
            context: context.into(),
            source,
        }
    }
}
