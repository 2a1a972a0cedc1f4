//! Check failures reported to the student.
//!
//! Every variant is fatal: the run stops at the first one and prints its
//! message behind a failure marker. Infrastructure faults (spawn errors, broken
//! harness output) travel as plain `anyhow` errors instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::distribution::OutcomeCounts;
use crate::core::types::{Choice, Outcome};

/// Which stage of the contract a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Target file, function, arity, callability, or checker configuration.
    Setup,
    /// The decision function broke the truth table.
    Contract,
    /// The game CLI hung, crashed, or rejected a valid token.
    Behavioral,
    /// The outcome distribution does not look random.
    Statistical,
}

#[derive(Debug, Error)]
pub enum CheckFailure {
    #[error("Could not find {}.", path.display())]
    TargetMissing { path: PathBuf },

    #[error("Could not parse {}: {message}", path.display())]
    SyntaxError { path: PathBuf, message: String },

    #[error("Missing function: {name}(user: str, cpu: str) -> str")]
    MissingFunction { name: String },

    #[error("{name} must take exactly two arguments: (user, cpu); found {found}")]
    ArityMismatch { name: String, found: usize },

    #[error("{name} is not callable.")]
    NotCallable { name: String },

    #[error("{name} could not be defined in isolation: {message}")]
    DefinitionFailed { name: String, message: String },

    #[error("{message}")]
    InvalidConfig { message: String },

    #[error("{name} returned {repr} (not in {{'win', 'lose', 'draw'}}) for ({user},{cpu}).")]
    NonCanonicalReturn {
        name: String,
        user: Choice,
        cpu: Choice,
        repr: String,
    },

    #[error("{name} raised {message} for ({user},{cpu}).")]
    Raised {
        name: String,
        user: Choice,
        cpu: Choice,
        message: String,
    },

    #[error("{name} did not return within {timeout_secs:.1}s for ({user},{cpu}).")]
    DecisionTimedOut {
        name: String,
        user: Choice,
        cpu: Choice,
        timeout_secs: f64,
    },

    #[error("{name} wrong for ({user},{cpu}): expected '{expected}', got '{got}'.")]
    TruthTableMismatch {
        name: String,
        user: Choice,
        cpu: Choice,
        expected: Outcome,
        got: Outcome,
    },

    #[error("Script hung when given {token:?}.")]
    Hung { token: String },

    #[error("Script exited with code {} for {token:?}.", display_code(.code))]
    NonZeroExit { token: String, code: Option<i32> },

    #[error("Script treated {token:?} as invalid input.")]
    RejectedInput { token: String },

    #[error("Run {trial}/{trials}: script hung or exited non-zero.")]
    TrialFailed { trial: usize, trials: usize },

    #[error(
        "Outcome distribution suggests non-uniform randomness. Parsed={parsed}/{trials}, counts={counts}.\n\
         Hint: ensure the computer choice is chosen uniformly at random from \
         {{'rock','paper','scissors'}}, and avoid fixed seeding."
    )]
    Skewed {
        parsed: usize,
        trials: usize,
        counts: OutcomeCounts,
    },

    #[error(
        "Outputs were identical across runs (parsed {parsed}/{trials} outcomes); randomness not detected.\n\
         Hint: print the computer's choice or ensure randomness is implemented."
    )]
    IdenticalOutputs { parsed: usize, trials: usize },
}

impl CheckFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            CheckFailure::TargetMissing { .. }
            | CheckFailure::SyntaxError { .. }
            | CheckFailure::MissingFunction { .. }
            | CheckFailure::ArityMismatch { .. }
            | CheckFailure::NotCallable { .. }
            | CheckFailure::DefinitionFailed { .. }
            | CheckFailure::InvalidConfig { .. } => FailureKind::Setup,
            CheckFailure::NonCanonicalReturn { .. }
            | CheckFailure::Raised { .. }
            | CheckFailure::DecisionTimedOut { .. }
            | CheckFailure::TruthTableMismatch { .. } => FailureKind::Contract,
            CheckFailure::Hung { .. }
            | CheckFailure::NonZeroExit { .. }
            | CheckFailure::RejectedInput { .. }
            | CheckFailure::TrialFailed { .. } => FailureKind::Behavioral,
            CheckFailure::Skewed { .. } | CheckFailure::IdenticalOutputs { .. } => {
                FailureKind::Statistical
            }
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "<signal>".to_string(), |code| code.to_string())
}
