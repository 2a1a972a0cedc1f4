//! I/O helpers for checker stages.

pub mod config;
pub mod extractor;
pub mod process;
pub mod prober;
pub mod progress;
