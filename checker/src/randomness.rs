//! Randomness check: many runs with the same input, then a distribution verdict.

use anyhow::Result;
use tracing::{debug, info, instrument};

use crate::core::classifier::OutcomeClassifier;
use crate::core::distribution::{DistributionVerdict, RandomnessPolicy, Trial, TrialBatch, evaluate};
use crate::core::types::{Choice, ProbeResult};
use crate::error::CheckFailure;
use crate::io::progress::ProgressSink;
use crate::io::prober::Prober;

/// Summary of a passed randomness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomnessReport {
    pub trials: usize,
    pub verdict: DistributionVerdict,
}

impl RandomnessReport {
    /// One-line description for the console.
    pub fn describe(&self) -> String {
        match &self.verdict {
            DistributionVerdict::Uniform { counts } => format!(
                "Outcome distribution looks random (win/lose/draw among parsed {} ≈ {}/{}/{}).",
                counts.parsed(),
                counts.win,
                counts.lose,
                counts.draw
            ),
            DistributionVerdict::Varied { distinct, parsed } => format!(
                "Outputs vary across runs (fallback uniqueness check passed; {distinct} distinct \
                 outputs, parsed {parsed}/{} outcomes).",
                self.trials
            ),
            DistributionVerdict::Skewed { .. } | DistributionVerdict::Identical { .. } => {
                "Randomness check failed.".to_string()
            }
        }
    }
}

/// Run the game `trials` times with `input_line` and judge the outcome spread.
///
/// Any hang or non-zero exit stops the check immediately.
#[instrument(skip(prober, classifier, policy, progress))]
pub fn verify_randomness<P, C, S>(
    prober: &P,
    classifier: &C,
    policy: &RandomnessPolicy,
    progress: &mut S,
    trials: usize,
    input_line: &str,
) -> Result<RandomnessReport>
where
    P: Prober + ?Sized,
    C: OutcomeClassifier + ?Sized,
    S: ProgressSink + ?Sized,
{
    if Choice::from_token(input_line).is_none() {
        return Err(CheckFailure::InvalidConfig {
            message: "Randomness check user input must be one of: rock/paper/scissors or r/p/s."
                .to_string(),
        }
        .into());
    }

    let mut batch = TrialBatch::default();
    progress.update(0, trials);
    for trial in 1..=trials {
        let result = match prober.probe(input_line) {
            Ok(result) => result,
            Err(err) => {
                progress.finish();
                return Err(err.context(format!("run {trial}/{trials}")));
            }
        };
        let text = match (&result, result.combined_text()) {
            (ProbeResult::Completed { exit_code: Some(0), .. }, Some(text)) => text,
            _ => {
                progress.finish();
                return Err(CheckFailure::TrialFailed { trial, trials }.into());
            }
        };
        let label = classifier.classify(&text);
        debug!(trial, %label, "trial classified");
        batch.push(Trial { text, label });
        progress.update(trial, trials);
    }
    progress.finish();

    let verdict = evaluate(&batch, policy);
    info!(?verdict, "randomness verdict");
    match verdict {
        DistributionVerdict::Skewed { counts } => Err(CheckFailure::Skewed {
            parsed: counts.parsed(),
            trials,
            counts,
        }
        .into()),
        DistributionVerdict::Identical { parsed } => {
            Err(CheckFailure::IdenticalOutputs { parsed, trials }.into())
        }
        verdict => Ok(RandomnessReport { trials, verdict }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::KeywordClassifier;
    use crate::core::distribution::OutcomeCounts;
    use crate::io::progress::NoProgress;
    use crate::test_support::{RecordingProgress, ScriptedProber, completed};

    fn run(prober: &ScriptedProber, trials: usize) -> Result<RandomnessReport> {
        verify_randomness(
            prober,
            &KeywordClassifier,
            &RandomnessPolicy::default(),
            &mut NoProgress,
            trials,
            "rock",
        )
    }

    #[test]
    fn always_win_fails_with_counts() {
        let prober = ScriptedProber::repeating(completed(0, "You win!!\n", ""));
        let err = run(&prober, 300).expect_err("skewed");
        assert!(matches!(
            err.downcast_ref::<CheckFailure>(),
            Some(CheckFailure::Skewed {
                parsed: 300,
                trials: 300,
                counts: OutcomeCounts {
                    win: 300,
                    lose: 0,
                    draw: 0,
                    ..
                },
            })
        ));
        assert!(err.to_string().contains("Parsed=300/300"));
        assert_eq!(prober.inputs().len(), 300);
    }

    #[test]
    fn cycling_outcomes_pass() {
        let prober = ScriptedProber::cycle(vec![
            completed(0, "Computer picked scissors\nYou win!!\n", ""),
            completed(0, "Computer picked paper\nYou lose:(\n", ""),
            completed(0, "Computer picked rock\ndraw\n", ""),
        ]);
        let report = run(&prober, 30).expect("uniform");
        assert_eq!(
            report.verdict,
            DistributionVerdict::Uniform {
                counts: OutcomeCounts {
                    win: 10,
                    lose: 10,
                    draw: 10,
                    unparseable: 0,
                }
            }
        );
        assert!(report.describe().contains("10/10/10"));
    }

    #[test]
    fn unparseable_but_varied_output_uses_fallback() {
        let prober = ScriptedProber::cycle(vec![
            completed(0, "cpu: rock\n", ""),
            completed(0, "cpu: paper\n", ""),
        ]);
        let report = run(&prober, 10).expect("fallback");
        assert_eq!(
            report.verdict,
            DistributionVerdict::Varied {
                distinct: 2,
                parsed: 0
            }
        );
    }

    #[test]
    fn unparseable_identical_output_fails() {
        let prober = ScriptedProber::repeating(completed(0, "thanks for playing\n", ""));
        let err = run(&prober, 10).expect_err("identical");
        assert!(matches!(
            err.downcast_ref::<CheckFailure>(),
            Some(CheckFailure::IdenticalOutputs {
                parsed: 0,
                trials: 10
            })
        ));
    }

    #[test]
    fn hang_mid_batch_stops_immediately() {
        let prober = ScriptedProber::new(vec![
            completed(0, "You win!!", ""),
            completed(0, "You lose", ""),
            ProbeResult::TimedOut,
            completed(0, "draw", ""),
        ]);
        let err = run(&prober, 10).expect_err("hung");
        assert_eq!(
            err.to_string(),
            "Run 3/10: script hung or exited non-zero."
        );
        assert_eq!(prober.inputs().len(), 3);
    }

    #[test]
    fn non_zero_exit_is_fatal() {
        let prober = ScriptedProber::repeating(completed(2, "You win!!", ""));
        let err = run(&prober, 10).expect_err("exit code");
        assert!(matches!(
            err.downcast_ref::<CheckFailure>(),
            Some(CheckFailure::TrialFailed { trial: 1, trials: 10 })
        ));
    }

    #[test]
    fn invalid_input_token_is_rejected_before_probing() {
        let prober = ScriptedProber::repeating(completed(0, "You win!!", ""));
        let err = verify_randomness(
            &prober,
            &KeywordClassifier,
            &RandomnessPolicy::default(),
            &mut NoProgress,
            10,
            "lizard",
        )
        .expect_err("invalid token");
        assert!(err.to_string().contains("rock/paper/scissors or r/p/s"));
        assert!(prober.inputs().is_empty());
    }

    #[test]
    fn probe_error_still_ends_the_progress_line() {
        let prober = ScriptedProber::new(vec![completed(0, "You win!!", "")]);
        let mut progress = RecordingProgress::default();
        let err = verify_randomness(
            &prober,
            &KeywordClassifier,
            &RandomnessPolicy::default(),
            &mut progress,
            5,
            "rock",
        )
        .expect_err("game could not be started");
        assert!(format!("{err:#}").starts_with("run 2/5: "));
        assert_eq!(progress.updates, vec![0, 1]);
        assert!(progress.finished);
    }

    #[test]
    fn progress_sees_every_trial() {
        let prober = ScriptedProber::cycle(vec![
            completed(0, "win", ""),
            completed(0, "lose", ""),
            completed(0, "tie", ""),
        ]);
        let mut progress = RecordingProgress::default();
        verify_randomness(
            &prober,
            &KeywordClassifier,
            &RandomnessPolicy::default(),
            &mut progress,
            6,
            "r",
        )
        .expect("uniform");
        assert_eq!(progress.updates, vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(progress.finished);
        assert_eq!(prober.inputs(), vec!["r"; 6]);
    }
}
