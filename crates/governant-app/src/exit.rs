//! Exit code mapping.

use governant_engine::{ErrorKind, PolicyError};
use governant_types::ids::{
    EXIT_DENIED, EXIT_ERROR, EXIT_INVALID_INPUT, EXIT_OK, EXIT_UNAVAILABLE, EXIT_VIOLATIONS,
};

use crate::query::Outcome;

/// Map a successful query to an exit code. Denials and violations only fail the process when
/// `strict_exit` is set.
pub fn outcome_exit_code(outcome: Outcome, strict_exit: bool) -> i32 {
    if !strict_exit {
        return EXIT_OK;
    }
    match outcome {
        Outcome::Allowed | Outcome::Evaluated => EXIT_OK,
        Outcome::Denied => EXIT_DENIED,
        Outcome::ViolationsFound => EXIT_VIOLATIONS,
    }
}

/// Map a failed run to an exit code, from the first [`PolicyError`] in the cause chain.
pub fn error_exit_code(err: &anyhow::Error) -> i32 {
    let Some(policy_err) = err.chain().find_map(|e| e.downcast_ref::<PolicyError>()) else {
        return EXIT_ERROR;
    };
    match policy_err.kind() {
        ErrorKind::Invalid => EXIT_INVALID_INPUT,
        ErrorKind::Unavailable => EXIT_UNAVAILABLE,
        ErrorKind::Evaluation => EXIT_ERROR,
    }
}
