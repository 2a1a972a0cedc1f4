//! Deterministic, pure logic shared by the checker.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod classifier;
pub mod distribution;
pub mod truth_table;
pub mod types;
