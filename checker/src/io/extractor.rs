//! Isolate one top-level function from a Python source file and run it alone.
//!
//! The file is parsed, never executed. Only the source text of the matched
//! definition is handed to a fresh interpreter, which executes it in an empty
//! namespace, so the game loop, prompts, and random choices at module level
//! never run.
//!
//! This is not a security boundary. The isolated function runs with the full
//! privileges of the checker; it is meant for grading trusted coursework.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use rustpython_parser::Parse;
use rustpython_parser::ast::{self, Ranged};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::core::truth_table::DecisionFunction;
use crate::core::types::{Choice, Returned};
use crate::error::CheckFailure;
use crate::io::process::run_command_with_timeout;

const HARNESS: &str = include_str!("decide_harness.py");

/// Number of positional parameters the decision function must declare.
pub const REQUIRED_ARITY: usize = 2;

/// A function definition lifted out of its module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSource {
    pub name: String,
    pub path: PathBuf,
    /// 1-based line of the first decorator or the `def` keyword.
    pub line: usize,
    /// The definition alone, preceded by blank lines so tracebacks keep the
    /// original line numbers.
    pub program: String,
}

/// Locate `name` among the top-level definitions of `path` and lift it out.
///
/// Only plain `def` statements directly in the module body are considered;
/// methods, nested functions and `async def` never match. The first match wins.
#[instrument(skip_all, fields(path = %path.display(), name))]
pub fn locate_function(path: &Path, name: &str) -> Result<FunctionSource> {
    if !path.is_file() {
        return Err(CheckFailure::TargetMissing {
            path: path.to_path_buf(),
        }
        .into());
    }
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let suite = ast::Suite::parse(&text, &path.display().to_string()).map_err(|err| {
        CheckFailure::SyntaxError {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    })?;

    let Some((stmt, def)) = suite.iter().find_map(|stmt| match stmt {
        ast::Stmt::FunctionDef(def) if def.name.as_str() == name => Some((stmt, def)),
        _ => None,
    }) else {
        return Err(CheckFailure::MissingFunction {
            name: name.to_string(),
        }
        .into());
    };

    let arity = def.args.posonlyargs.len() + def.args.args.len();
    if arity != REQUIRED_ARITY {
        return Err(CheckFailure::ArityMismatch {
            name: name.to_string(),
            found: arity,
        }
        .into());
    }

    let start = def
        .decorator_list
        .iter()
        .map(|decorator| usize::from(decorator.range().start()))
        .chain(std::iter::once(usize::from(stmt.range().start())))
        .min()
        .unwrap_or_default();
    let end = usize::from(stmt.range().end());
    let line_start = text[..start].rfind('\n').map_or(0, |idx| idx + 1);
    let preceding_lines = text[..line_start].matches('\n').count();

    let mut program = "\n".repeat(preceding_lines);
    program.push_str(&text[line_start..end]);
    program.push('\n');

    debug!(line = preceding_lines + 1, arity, "function located");
    Ok(FunctionSource {
        name: name.to_string(),
        path: path.to_path_buf(),
        line: preceding_lines + 1,
        program,
    })
}

/// Interpreter used to execute isolated definitions.
#[derive(Debug, Clone)]
pub struct Interpreter {
    pub program: String,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl Interpreter {
    pub fn new(program: impl Into<String>, timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            program: program.into(),
            timeout,
            output_limit_bytes,
        }
    }
}

#[derive(Debug, Serialize)]
struct HarnessRequest<'a> {
    source: &'a str,
    filename: String,
    name: &'a str,
    calls: Vec<[&'static str; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum HarnessResponse {
    Ok { results: Vec<Returned> },
    NotCallable,
    Error { message: String },
}

enum HarnessRun {
    Finished(HarnessResponse),
    TimedOut,
}

/// A decision function executed in isolation, one fresh interpreter per call.
#[derive(Debug, Clone)]
pub struct IsolatedFunction {
    source: FunctionSource,
    interpreter: Interpreter,
}

impl IsolatedFunction {
    pub fn source(&self) -> &FunctionSource {
        &self.source
    }

    fn run_harness(&self, calls: Vec<[&'static str; 2]>) -> Result<HarnessRun> {
        let request = HarnessRequest {
            source: &self.source.program,
            filename: self.source.path.display().to_string(),
            name: &self.source.name,
            calls,
        };
        let payload = serde_json::to_vec(&request).context("serialize harness request")?;

        let mut cmd = Command::new(&self.interpreter.program);
        cmd.arg("-c").arg(HARNESS);
        let output = run_command_with_timeout(
            cmd,
            Some(&payload),
            self.interpreter.timeout,
            self.interpreter.output_limit_bytes,
        )
        .with_context(|| format!("run interpreter {}", self.interpreter.program))?;

        if output.timed_out {
            warn!(name = %self.source.name, "isolated function timed out");
            return Ok(HarnessRun::TimedOut);
        }

        let stdout = output.stdout_lossy();
        let Some(line) = stdout.lines().rev().find(|line| !line.trim().is_empty()) else {
            bail!(
                "interpreter produced no result (exit code {:?}): {}",
                output.status.code(),
                output.stderr_lossy().trim()
            );
        };
        let response: HarnessResponse =
            serde_json::from_str(line).context("parse harness response")?;
        Ok(HarnessRun::Finished(response))
    }
}

/// Lift `name` out of `path` and confirm that defining it alone yields a callable.
#[instrument(skip_all, fields(path = %path.display(), name))]
pub fn extract_function(path: &Path, name: &str, interpreter: Interpreter) -> Result<IsolatedFunction> {
    let source = locate_function(path, name)?;
    let function = IsolatedFunction {
        source,
        interpreter,
    };

    match function.run_harness(Vec::new())? {
        HarnessRun::Finished(HarnessResponse::Ok { .. }) => {
            info!(line = function.source.line, "function extracted");
            Ok(function)
        }
        HarnessRun::Finished(HarnessResponse::NotCallable) => Err(CheckFailure::NotCallable {
            name: name.to_string(),
        }
        .into()),
        HarnessRun::Finished(HarnessResponse::Error { message }) => {
            Err(CheckFailure::DefinitionFailed {
                name: name.to_string(),
                message,
            }
            .into())
        }
        HarnessRun::TimedOut => Err(CheckFailure::DefinitionFailed {
            name: name.to_string(),
            message: format!(
                "timed out after {:.1}s",
                function.interpreter.timeout.as_secs_f64()
            ),
        }
        .into()),
    }
}

impl DecisionFunction for IsolatedFunction {
    fn name(&self) -> &str {
        &self.source.name
    }

    fn decide(&self, user: Choice, cpu: Choice) -> Result<Returned> {
        let run = self.run_harness(vec![[user.as_str(), cpu.as_str()]])?;
        let response = match run {
            HarnessRun::Finished(response) => response,
            HarnessRun::TimedOut => {
                return Err(CheckFailure::DecisionTimedOut {
                    name: self.source.name.clone(),
                    user,
                    cpu,
                    timeout_secs: self.interpreter.timeout.as_secs_f64(),
                }
                .into());
            }
        };
        match response {
            HarnessResponse::Ok { results } => results
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("harness returned no result for ({user},{cpu})")),
            HarnessResponse::NotCallable => Err(CheckFailure::NotCallable {
                name: self.source.name.clone(),
            }
            .into()),
            HarnessResponse::Error { message } => Err(CheckFailure::DefinitionFailed {
                name: self.source.name.clone(),
                message,
            }
            .into()),
        }
    }
}
