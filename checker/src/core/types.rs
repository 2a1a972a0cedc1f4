//! Shared deterministic types for checker core logic.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// One of the three canonical game choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Rock,
    Paper,
    Scissors,
}

impl Choice {
    /// Canonical choices in truth-table order.
    pub const ALL: [Choice; 3] = [Choice::Rock, Choice::Paper, Choice::Scissors];

    pub fn as_str(self) -> &'static str {
        match self {
            Choice::Rock => "rock",
            Choice::Paper => "paper",
            Choice::Scissors => "scissors",
        }
    }

    /// Single-letter shortcut accepted by the game CLI.
    pub fn shortcut(self) -> &'static str {
        match self {
            Choice::Rock => "r",
            Choice::Paper => "p",
            Choice::Scissors => "s",
        }
    }

    /// Parse a full word or shortcut. Exact, lowercase match only.
    pub fn from_token(token: &str) -> Option<Choice> {
        Choice::ALL
            .into_iter()
            .find(|choice| token == choice.as_str() || token == choice.shortcut())
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Choice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Choice::from_token(s).ok_or_else(|| anyhow!("unknown choice {s:?}"))
    }
}

/// Outcome of one round from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
    Draw,
}

impl Outcome {
    /// Labels in reporting order.
    pub const ALL: [Outcome; 3] = [Outcome::Win, Outcome::Lose, Outcome::Draw];

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Lose => "lose",
            Outcome::Draw => "draw",
        }
    }

    /// Exact, case-sensitive match against the canonical labels.
    pub fn from_label(label: &str) -> Option<Outcome> {
        Outcome::ALL
            .into_iter()
            .find(|outcome| outcome.as_str() == label)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of free-text game output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeLabel {
    Parsed(Outcome),
    Unparseable,
}

impl OutcomeLabel {
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            OutcomeLabel::Parsed(outcome) => Some(outcome),
            OutcomeLabel::Unparseable => None,
        }
    }
}

impl fmt::Display for OutcomeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeLabel::Parsed(outcome) => outcome.fmt(f),
            OutcomeLabel::Unparseable => f.write_str("unparseable"),
        }
    }
}

/// One invocation of the game CLI.
///
/// A timed-out child has no exit code and no output worth looking at, so the two
/// cases are separate variants rather than a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Completed {
        /// `None` when the child was terminated by a signal.
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    TimedOut,
}

impl ProbeResult {
    /// Stdout and stderr joined by a newline, the text every classifier sees.
    pub fn combined_text(&self) -> Option<String> {
        match self {
            ProbeResult::Completed { stdout, stderr, .. } => Some(format!("{stdout}\n{stderr}")),
            ProbeResult::TimedOut => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProbeResult::Completed { exit_code, .. } => *exit_code,
            ProbeResult::TimedOut => None,
        }
    }
}

/// Value produced by one call of the isolated decision function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Returned {
    /// A `str` value, verbatim.
    Text { value: String },
    /// Anything else, kept as its interpreter representation.
    Other { repr: String },
    /// The call raised instead of returning.
    Raised { message: String },
}
