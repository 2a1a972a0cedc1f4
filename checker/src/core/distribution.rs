//! Aggregate statistics over a batch of randomness trials.
//!
//! Two-tier policy:
//! - **Primary**: when enough runs were classified, every label's share of the
//!   parsed runs must sit inside `[lower, upper]`.
//! - **Fallback**: otherwise, the raw outputs must not all be identical.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::{Outcome, OutcomeLabel};

/// Acceptance thresholds for the randomness check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomnessPolicy {
    /// Fraction of runs that must be classified to take the primary path.
    pub min_parse_rate: f64,
    /// Lowest acceptable share for each label (inclusive).
    pub lower: f64,
    /// Highest acceptable share for each label (inclusive).
    pub upper: f64,
}

impl Default for RandomnessPolicy {
    fn default() -> Self {
        Self {
            min_parse_rate: 0.7,
            lower: 0.20,
            upper: 0.46,
        }
    }
}

impl RandomnessPolicy {
    /// Minimum number of parsed runs, rounded down, for a batch of `trials`.
    pub fn required_parsed(&self, trials: usize) -> usize {
        (self.min_parse_rate * trials as f64).floor() as usize
    }

    fn accepts_share(&self, share: f64) -> bool {
        self.lower <= share && share <= self.upper
    }
}

/// One classified run of the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trial {
    /// Combined stdout/stderr text.
    pub text: String,
    pub label: OutcomeLabel,
}

/// Trials in probe order.
#[derive(Debug, Default)]
pub struct TrialBatch {
    trials: Vec<Trial>,
}

impl TrialBatch {
    pub fn push(&mut self, trial: Trial) {
        self.trials.push(trial);
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for trial in &self.trials {
            counts.record(trial.label);
        }
        counts
    }

    pub fn distinct_outputs(&self) -> usize {
        self.trials
            .iter()
            .map(|trial| trial.text.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

impl FromIterator<Trial> for TrialBatch {
    fn from_iter<I: IntoIterator<Item = Trial>>(iter: I) -> Self {
        Self {
            trials: iter.into_iter().collect(),
        }
    }
}

/// Per-label tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub win: usize,
    pub lose: usize,
    pub draw: usize,
    pub unparseable: usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, label: OutcomeLabel) {
        match label {
            OutcomeLabel::Parsed(Outcome::Win) => self.win += 1,
            OutcomeLabel::Parsed(Outcome::Lose) => self.lose += 1,
            OutcomeLabel::Parsed(Outcome::Draw) => self.draw += 1,
            OutcomeLabel::Unparseable => self.unparseable += 1,
        }
    }

    pub fn get(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Win => self.win,
            Outcome::Lose => self.lose,
            Outcome::Draw => self.draw,
        }
    }

    pub fn parsed(&self) -> usize {
        self.win + self.lose + self.draw
    }
}

impl fmt::Display for OutcomeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{win: {}, lose: {}, draw: {}}}",
            self.win, self.lose, self.draw
        )
    }
}

/// Result of applying a [`RandomnessPolicy`] to a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributionVerdict {
    /// Primary path passed.
    Uniform { counts: OutcomeCounts },
    /// Primary path failed.
    Skewed { counts: OutcomeCounts },
    /// Fallback path passed.
    Varied { distinct: usize, parsed: usize },
    /// Fallback path failed.
    Identical { parsed: usize },
}

impl DistributionVerdict {
    pub fn passed(&self) -> bool {
        matches!(
            self,
            DistributionVerdict::Uniform { .. } | DistributionVerdict::Varied { .. }
        )
    }
}

/// Decide whether a completed batch looks random.
pub fn evaluate(batch: &TrialBatch, policy: &RandomnessPolicy) -> DistributionVerdict {
    let counts = batch.counts();
    let parsed = counts.parsed();

    if parsed > 0 && parsed >= policy.required_parsed(batch.len()) {
        let uniform = Outcome::ALL
            .into_iter()
            .all(|outcome| policy.accepts_share(counts.get(outcome) as f64 / parsed as f64));
        return if uniform {
            DistributionVerdict::Uniform { counts }
        } else {
            DistributionVerdict::Skewed { counts }
        };
    }

    let distinct = batch.distinct_outputs();
    if distinct >= 2 {
        DistributionVerdict::Varied { distinct, parsed }
    } else {
        DistributionVerdict::Identical { parsed }
    }
}
