//! Test-only doubles for probers, decision functions, and progress sinks.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::process::{Command, Stdio};

use anyhow::{Result, anyhow};

use crate::core::truth_table::DecisionFunction;
use crate::core::types::{Choice, ProbeResult, Returned};
use crate::io::progress::ProgressSink;
use crate::io::prober::Prober;

/// Build a completed probe result.
pub fn completed(exit_code: i32, stdout: &str, stderr: &str) -> ProbeResult {
    ProbeResult::Completed {
        exit_code: Some(exit_code),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

enum Script {
    Queue(VecDeque<ProbeResult>),
    Cycle(Vec<ProbeResult>),
}

/// Prober that replays predetermined results and records every input line.
pub struct ScriptedProber {
    script: RefCell<Script>,
    inputs: RefCell<Vec<String>>,
}

impl ScriptedProber {
    /// Replay `results` once, in order; probing past the end is an error.
    pub fn new(results: Vec<ProbeResult>) -> Self {
        Self::with_script(Script::Queue(results.into()))
    }

    /// Return the same result forever.
    pub fn repeating(result: ProbeResult) -> Self {
        Self::cycle(vec![result])
    }

    /// Replay `results` round-robin forever.
    pub fn cycle(results: Vec<ProbeResult>) -> Self {
        Self::with_script(Script::Cycle(results))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script: RefCell::new(script),
            inputs: RefCell::new(Vec::new()),
        }
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.borrow().clone()
    }
}

impl Prober for ScriptedProber {
    fn probe(&self, input_line: &str) -> Result<ProbeResult> {
        let mut inputs = self.inputs.borrow_mut();
        let index = inputs.len();
        inputs.push(input_line.to_string());
        match &mut *self.script.borrow_mut() {
            Script::Queue(queue) => queue
                .pop_front()
                .ok_or_else(|| anyhow!("scripted prober exhausted after {index} probes")),
            Script::Cycle(results) if !results.is_empty() => {
                Ok(results[index % results.len()].clone())
            }
            Script::Cycle(_) => Err(anyhow!("scripted prober has no results")),
        }
    }
}

/// Decision function backed by a closure; counts its calls.
pub struct FnDecision<F> {
    name: String,
    decide: F,
    calls: Cell<usize>,
}

impl<F: Fn(Choice, Choice) -> Returned> FnDecision<F> {
    pub fn new(name: &str, decide: F) -> Self {
        Self {
            name: name.to_string(),
            decide,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl<F: Fn(Choice, Choice) -> Returned> DecisionFunction for FnDecision<F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn decide(&self, user: Choice, cpu: Choice) -> Result<Returned> {
        self.calls.set(self.calls.get() + 1);
        Ok((self.decide)(user, cpu))
    }
}

/// Progress sink that remembers every `done` value it was shown.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub updates: Vec<usize>,
    pub finished: bool,
}

impl ProgressSink for RecordingProgress {
    fn update(&mut self, done: usize, _total: usize) {
        self.updates.push(done);
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

/// True if `python3` can be started; tests that need an interpreter skip otherwise.
pub fn python3_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}
