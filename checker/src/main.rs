//! `rps-check`: grade a rock-paper-scissors game.
//!
//! Extracts `decide_winner` from the game file and checks its truth table, then
//! runs the game as a child process to check token acceptance and the spread of
//! outcomes. Stops at the first failure.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use checker::check::{CheckContext, failure_line, run_all};
use checker::core::classifier::KeywordClassifier;
use checker::exit_codes;
use checker::io::config::{CheckerConfig, DEFAULT_CONFIG_FILE, load_config};
use checker::io::extractor::{Interpreter, extract_function};
use checker::io::prober::CliProber;
use checker::io::progress::{NoProgress, ProgressBar, ProgressSink};
use checker::logging;

#[derive(Parser, Debug)]
#[command(
    name = "rps-check",
    version,
    about = "Checker for a rock-paper-scissors game"
)]
struct Cli {
    /// Number of runs for the randomness check.
    #[arg(long)]
    trials: Option<u32>,

    /// User input used during the randomness check (rock/paper/scissors or r/p/s).
    #[arg(long)]
    user: Option<String>,

    /// Game file to check.
    #[arg(long)]
    target: Option<PathBuf>,

    /// Name of the decision function to extract.
    #[arg(long)]
    function: Option<String>,

    /// Interpreter used to run the game and the extracted function.
    #[arg(long)]
    python: Option<String>,

    /// Per-process timeout in seconds.
    #[arg(long)]
    timeout: Option<f64>,

    /// Configuration file; missing means defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Do not draw the progress bar.
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    /// Layer command-line flags over the file configuration.
    fn apply_overrides(&self, mut cfg: CheckerConfig) -> CheckerConfig {
        if let Some(trials) = self.trials {
            cfg.trials = trials;
        }
        if let Some(user) = &self.user {
            cfg.user = user.clone();
        }
        if let Some(target) = &self.target {
            cfg.target = target.clone();
        }
        if let Some(function) = &self.function {
            cfg.function = function.clone();
        }
        if let Some(python) = &self.python {
            cfg.python = python.clone();
        }
        if let Some(timeout) = self.timeout {
            cfg.timeout_secs = timeout;
        }
        if self.no_progress {
            cfg.progress = false;
        }
        cfg
    }
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        println!("{}", failure_line(&err));
        std::process::exit(exit_codes::FAILED);
    }
    std::process::exit(exit_codes::OK);
}

fn run(cli: &Cli) -> Result<()> {
    let cfg = load_config(&cli.config).context("load checker config")?;
    let cfg = cli.apply_overrides(cfg);
    cfg.validate()?;
    debug!(?cfg, "configuration resolved");

    let interpreter = Interpreter::new(&cfg.python, cfg.timeout(), cfg.output_limit_bytes);
    let prober = CliProber::new(&cfg.python, vec![cfg.target.display().to_string()])
        .with_timeout(cfg.timeout())
        .with_output_limit(cfg.output_limit_bytes);

    let mut progress: Box<dyn ProgressSink> = if cfg.progress {
        Box::new(ProgressBar::new(io::stdout()))
    } else {
        Box::new(NoProgress)
    };
    let mut stdout = io::stdout();
    let mut ctx = CheckContext {
        prober: &prober,
        classifier: &KeywordClassifier,
        progress: progress.as_mut(),
        policy: cfg.randomness,
        trials: cfg.trials as usize,
        user: &cfg.user,
        out: &mut stdout,
    };

    run_all(
        || extract_function(&cfg.target, &cfg.function, interpreter),
        &mut ctx,
    )
}
