//! Grading checker for rock-paper-scissors command-line games.
//!
//! The checker treats the student's game as a black box and verifies a fixed
//! contract: a pure `decide_winner(user, cpu)` function, acceptance of full
//! words and shortcuts on stdin, and a uniformly random computer choice.
//!
//! - **[`core`]**: Pure, deterministic logic (truth table, output
//!   classification, distribution statistics). No I/O.
//! - **[`io`]**: Side-effecting operations (child processes, function
//!   extraction, configuration, progress rendering).
//!
//! Orchestration modules ([`acceptance`], [`randomness`], [`check`]) combine the
//! two into the check sequence the `rps-check` binary runs.

pub mod acceptance;
pub mod check;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod randomness;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
