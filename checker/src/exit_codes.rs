//! Stable exit codes for the `rps-check` binary.

/// Every check passed.
pub const OK: i32 = 0;
/// A check failed, or the checker could not run (bad config, missing interpreter).
pub const FAILED: i32 = 1;
