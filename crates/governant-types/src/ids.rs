//! Stable identifiers: rule names, violation codes, and process exit codes.

// Rules evaluated under a policy package.
pub const RULE_ALLOW: &str = "allow";
pub const RULE_VIOLATIONS: &str = "violations";

/// Root segment every normalized entrypoint starts with.
pub const DATA_ROOT: &str = "data";

/// Entry name of the compiled module inside a bundle archive.
pub const BUNDLE_MODULE_ENTRY: &str = "policy.wasm";
/// Bundle manifest file name.
pub const BUNDLE_MANIFEST: &str = ".manifest";

// Codes emitted by the reference deploy policy.
pub const CODE_INSUFFICIENT_APPROVALS: &str = "insufficient_approvals";
pub const CODE_TESTS_FAILED: &str = "tests_failed";
pub const CODE_MISSING_SIGNOFF: &str = "missing_signoff";
pub const CODE_RATE_LIMIT_EXCEEDED: &str = "rate_limit_exceeded";
pub const CODE_MISSING_TICKET: &str = "missing_ticket";

// Exit codes
pub const EXIT_OK: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_DENIED: i32 = 2;
pub const EXIT_VIOLATIONS: i32 = 3;
pub const EXIT_INVALID_INPUT: i32 = 4;
pub const EXIT_UNAVAILABLE: i32 = 5;
