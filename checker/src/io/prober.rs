//! Probe the game CLI: one fresh process, one line of input.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, instrument, warn};

use crate::core::types::ProbeResult;
use crate::io::process::run_command_with_timeout;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(2500);
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 64 * 1024;

/// Something that can run the game once with a single line of input.
pub trait Prober {
    fn probe(&self, input_line: &str) -> Result<ProbeResult>;
}

/// Runs `program args...` as a child process for every probe.
#[derive(Debug, Clone)]
pub struct CliProber {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl CliProber {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            workdir: None,
            timeout: DEFAULT_PROBE_TIMEOUT,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_output_limit(mut self, output_limit_bytes: usize) -> Self {
        self.output_limit_bytes = output_limit_bytes;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Prober for CliProber {
    #[instrument(skip(self), fields(program = %self.program))]
    fn probe(&self, input_line: &str) -> Result<ProbeResult> {
        let input = format!("{input_line}\n");
        let output = run_command_with_timeout(
            self.command(),
            Some(input.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )?;

        if output.timed_out {
            warn!(input_line, "probe timed out");
            return Ok(ProbeResult::TimedOut);
        }

        let result = ProbeResult::Completed {
            exit_code: output.status.code(),
            stdout: output.stdout_lossy(),
            stderr: output.stderr_lossy(),
        };
        debug!(exit_code = ?result.exit_code(), "probe finished");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh_prober(script: &str) -> CliProber {
        CliProber::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn feeds_exactly_one_line() {
        let prober = sh_prober("read choice; echo \"you picked [$choice]\"; cat");
        let result = prober.probe("paper").expect("probe");
        assert_eq!(
            result,
            ProbeResult::Completed {
                exit_code: Some(0),
                stdout: "you picked [paper]\n".to_string(),
                stderr: String::new(),
            }
        );
    }

    #[test]
    fn sleeping_child_times_out() {
        let prober = sh_prober("exec sleep 10").with_timeout(Duration::from_millis(200));
        assert_eq!(prober.probe("rock").expect("probe"), ProbeResult::TimedOut);
    }

    #[test]
    fn shell_waiting_on_its_own_child_times_out_on_schedule() {
        let prober = sh_prober("sleep 6; true").with_timeout(Duration::from_millis(300));
        let started = std::time::Instant::now();
        assert_eq!(prober.probe("rock").expect("probe"), ProbeResult::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
    }

    #[test]
    fn child_waiting_for_more_input_sees_eof() {
        let prober = sh_prober("read a; read b || echo eof").with_timeout(Duration::from_secs(5));
        let result = prober.probe("rock").expect("probe");
        assert_eq!(result.combined_text().as_deref(), Some("eof\n\n"));
    }

    #[test]
    fn non_zero_exit_is_reported() {
        let prober = sh_prober("echo bad >&2; exit 4");
        let result = prober.probe("x").expect("probe");
        assert_eq!(result.exit_code(), Some(4));
        assert_eq!(result.combined_text().as_deref(), Some("\nbad\n"));
    }

    #[test]
    fn runs_in_workdir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut prober = sh_prober("pwd");
        prober.workdir = Some(temp.path().to_path_buf());
        let result = prober.probe("").expect("probe");
        let text = result.combined_text().expect("completed");
        let reported = PathBuf::from(text.trim());
        assert_eq!(
            reported.canonicalize().expect("canonical reported"),
            temp.path().canonicalize().expect("canonical temp")
        );
    }
}
