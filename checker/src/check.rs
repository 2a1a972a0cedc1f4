//! Top-level check sequence.
//!
//! Runs extraction, the truth table, both acceptance checks, and the randomness
//! check in that order, printing one marker line per passed stage. The first
//! failure ends the sequence; the caller prints it and exits non-zero.

use std::io::Write;

use anyhow::Result;
use tracing::{info, instrument};

use crate::acceptance::{check_tokens_accepted, full_words, shortcuts};
use crate::core::classifier::OutcomeClassifier;
use crate::core::distribution::RandomnessPolicy;
use crate::core::truth_table::{DecisionFunction, verify_truth_table};
use crate::io::progress::ProgressSink;
use crate::io::prober::Prober;
use crate::randomness::verify_randomness;

pub const OK_MARK: &str = "\u{2705}";
pub const FAIL_MARK: &str = "\u{274c}";

const BANNER_EDGE: &str = "\u{1f308}\u{2728}\u{1f42c}";
const BANNER_WORD: &str = "rochambeau";

/// Collaborators and settings for one checker run.
pub struct CheckContext<'a> {
    pub prober: &'a dyn Prober,
    pub classifier: &'a dyn OutcomeClassifier,
    pub progress: &'a mut dyn ProgressSink,
    pub policy: RandomnessPolicy,
    pub trials: usize,
    pub user: &'a str,
    pub out: &'a mut dyn Write,
}

/// Run every check in order, stopping at the first failure.
///
/// `extract` is only invoked after the header is printed, so setup failures show
/// up in the same place as every other failure.
#[instrument(skip_all, fields(trials = ctx.trials, user = ctx.user))]
pub fn run_all<F, E>(extract: E, ctx: &mut CheckContext<'_>) -> Result<()>
where
    F: DecisionFunction,
    E: FnOnce() -> Result<F>,
{
    writeln!(ctx.out, "== RPS checker ==")?;

    let function = extract()?;
    verify_truth_table(&function)?;
    pass(ctx.out, &format!("{} truth table OK.", function.name()))?;

    check_tokens_accepted(ctx.prober, &full_words())?;
    pass(ctx.out, "CLI accepts full words rock/paper/scissors.")?;

    check_tokens_accepted(ctx.prober, &shortcuts())?;
    pass(ctx.out, "CLI accepts shortcuts r/p/s.")?;

    writeln!(
        ctx.out,
        "== Randomness check: {} runs with input {:?} ==",
        ctx.trials, ctx.user
    )?;
    ctx.out.flush()?;
    let report = verify_randomness(
        ctx.prober,
        ctx.classifier,
        &ctx.policy,
        &mut *ctx.progress,
        ctx.trials,
        ctx.user,
    )?;
    pass(ctx.out, &report.describe())?;

    pass(ctx.out, "All checks passed.")?;
    write_banner(ctx.out)?;
    info!("all checks passed");
    Ok(())
}

fn pass(out: &mut dyn Write, message: &str) -> Result<()> {
    writeln!(out, "{OK_MARK} {message}")?;
    Ok(())
}

/// Format a failure line for the console.
pub fn failure_line(err: &anyhow::Error) -> String {
    format!("{FAIL_MARK} {err:#}")
}

/// Cosmetic sign-off printed after a fully successful run.
fn write_banner(out: &mut dyn Write) -> Result<()> {
    write!(out, "{BANNER_EDGE}")?;
    for (i, c) in BANNER_WORD.chars().enumerate() {
        write!(out, "\x1b[38;5;{}m{c}\x1b[0m", i + 1)?;
    }
    writeln!(out, "{BANNER_EDGE}")?;
    Ok(())
}
