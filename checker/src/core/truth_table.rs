//! The fixed rock-paper-scissors truth table and its verification.

use anyhow::Result;

use crate::core::types::{Choice, Outcome, Returned};
use crate::error::CheckFailure;

/// Expected outcome for every `(user, cpu)` pair, in table order.
pub const EXPECTED: [((Choice, Choice), Outcome); 9] = [
    ((Choice::Rock, Choice::Rock), Outcome::Draw),
    ((Choice::Rock, Choice::Paper), Outcome::Lose),
    ((Choice::Rock, Choice::Scissors), Outcome::Win),
    ((Choice::Paper, Choice::Rock), Outcome::Win),
    ((Choice::Paper, Choice::Paper), Outcome::Draw),
    ((Choice::Paper, Choice::Scissors), Outcome::Lose),
    ((Choice::Scissors, Choice::Rock), Outcome::Lose),
    ((Choice::Scissors, Choice::Paper), Outcome::Win),
    ((Choice::Scissors, Choice::Scissors), Outcome::Draw),
];

/// Expected outcome for a pair, from the user's point of view.
pub fn expected_outcome(user: Choice, cpu: Choice) -> Outcome {
    match (user, cpu) {
        (Choice::Rock, Choice::Rock)
        | (Choice::Paper, Choice::Paper)
        | (Choice::Scissors, Choice::Scissors) => Outcome::Draw,
        (Choice::Rock, Choice::Scissors)
        | (Choice::Paper, Choice::Rock)
        | (Choice::Scissors, Choice::Paper) => Outcome::Win,
        (Choice::Rock, Choice::Paper)
        | (Choice::Paper, Choice::Scissors)
        | (Choice::Scissors, Choice::Rock) => Outcome::Lose,
    }
}

/// A two-argument decision function under test.
pub trait DecisionFunction {
    /// Name used in failure messages.
    fn name(&self) -> &str;

    /// Call the function with `(user, cpu)` in that order.
    fn decide(&self, user: Choice, cpu: Choice) -> Result<Returned>;
}

/// Call `function` for all 9 pairs and stop at the first contract violation.
pub fn verify_truth_table<F: DecisionFunction + ?Sized>(function: &F) -> Result<()> {
    let name = function.name().to_string();
    for ((user, cpu), expected) in EXPECTED {
        let got = match function.decide(user, cpu)? {
            Returned::Text { value } => value,
            Returned::Other { repr } => {
                return Err(CheckFailure::NonCanonicalReturn {
                    name,
                    user,
                    cpu,
                    repr,
                }
                .into());
            }
            Returned::Raised { message } => {
                return Err(CheckFailure::Raised {
                    name,
                    user,
                    cpu,
                    message,
                }
                .into());
            }
        };
        let Some(outcome) = Outcome::from_label(&got) else {
            return Err(CheckFailure::NonCanonicalReturn {
                name,
                user,
                cpu,
                repr: python_str_repr(&got),
            }
            .into());
        };
        if outcome != expected {
            return Err(CheckFailure::TruthTableMismatch {
                name,
                user,
                cpu,
                expected,
                got: outcome,
            }
            .into());
        }
    }
    Ok(())
}

/// Render a string the way Python's `repr` would, so messages match the game's language.
fn python_str_repr(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
