//! CLI-acceptance checks: every canonical token must be taken at face value.

use anyhow::Result;
use tracing::{debug, instrument};

use crate::core::classifier::looks_invalid;
use crate::core::types::{Choice, ProbeResult};
use crate::error::CheckFailure;
use crate::io::prober::Prober;

/// Full-word tokens in probe order.
pub fn full_words() -> Vec<&'static str> {
    Choice::ALL.into_iter().map(Choice::as_str).collect()
}

/// Single-letter tokens in probe order.
pub fn shortcuts() -> Vec<&'static str> {
    Choice::ALL.into_iter().map(Choice::shortcut).collect()
}

/// Probe each token once; it must not hang, must exit 0, and must not read as rejected.
#[instrument(skip(prober))]
pub fn check_tokens_accepted<P: Prober + ?Sized>(prober: &P, tokens: &[&str]) -> Result<()> {
    for &token in tokens {
        let result = prober.probe(token)?;
        let ProbeResult::Completed {
            exit_code,
            stdout,
            stderr,
        } = result
        else {
            return Err(CheckFailure::Hung {
                token: token.to_string(),
            }
            .into());
        };
        if exit_code != Some(0) {
            return Err(CheckFailure::NonZeroExit {
                token: token.to_string(),
                code: exit_code,
            }
            .into());
        }
        if looks_invalid(&format!("{stdout}\n{stderr}")) {
            return Err(CheckFailure::RejectedInput {
                token: token.to_string(),
            }
            .into());
        }
        debug!(token, "token accepted");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedProber, completed};

    #[test]
    fn token_lists() {
        assert_eq!(full_words(), vec!["rock", "paper", "scissors"]);
        assert_eq!(shortcuts(), vec!["r", "p", "s"]);
    }

    #[test]
    fn accepts_clean_runs() {
        let prober = ScriptedProber::repeating(completed(0, "Computer picked rock\ndraw\n", ""));
        check_tokens_accepted(&prober, &full_words()).expect("accepted");
        assert_eq!(prober.inputs(), vec!["rock", "paper", "scissors"]);
    }

    #[test]
    fn hang_names_the_token() {
        let prober = ScriptedProber::new(vec![
            completed(0, "You win!!", ""),
            ProbeResult::TimedOut,
        ]);
        let err = check_tokens_accepted(&prober, &shortcuts()).expect_err("hung");
        assert_eq!(err.to_string(), "Script hung when given \"p\".");
    }

    #[test]
    fn non_zero_exit_fails() {
        let prober = ScriptedProber::repeating(completed(1, "You win!!", ""));
        let err = check_tokens_accepted(&prober, &full_words()).expect_err("exit code");
        assert!(matches!(
            err.downcast_ref::<CheckFailure>(),
            Some(CheckFailure::NonZeroExit { code: Some(1), .. })
        ));
    }

    #[test]
    fn rejection_marker_on_stderr_fails() {
        let prober = ScriptedProber::repeating(completed(0, "", "Warning: unknown choice"));
        let err = check_tokens_accepted(&prober, &shortcuts()).expect_err("rejected");
        assert_eq!(err.to_string(), "Script treated \"r\" as invalid input.");
        assert_eq!(prober.inputs(), vec!["r"]);
    }
}
