#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use shakedown_core::adapter::in_target_call;
use shakedown_core::classify::Classification;
use shakedown_core::{replay, HarnessConfig, Orchestrator, RunReport, TargetRegistry};
use tracing_subscriber::EnvFilter;

/// Log file used when neither the config nor `--out` names one.
const DEFAULT_LOG_PATH: &str = "shakedown-findings.jsonl";

#[derive(Debug, Parser)]
#[command(name = "shakedown")]
#[command(about = "Randomized fuzz harness for small utility functions")]
struct Cli {
    /// tracing filter directive, e.g. `info` or `shakedown_core=debug`.
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fuzz the registered targets.
    Run(RunArgs),
    /// Re-run one trial of an earlier run.
    Replay {
        #[arg(long)]
        target: String,
        /// Run seed, as logged in `run_seed` on every trial line.
        #[arg(long)]
        seed: u64,
        #[arg(long)]
        trial: u64,
    },
    /// List the registered targets and their input shapes.
    List,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// JSON config file. Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    trials: Option<u64>,

    #[arg(long, env = "FUZZ_SEED")]
    seed: Option<u64>,

    /// Restrict the run to these targets. Repeatable.
    #[arg(long = "target")]
    targets: Vec<String>,

    /// Finding log destination.
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long)]
    parallel: bool,

    #[arg(long)]
    max_total_trials: Option<u64>,

    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Record timestamps and per-trial durations in the log.
    #[arg(long)]
    timing: bool,
}

impl RunArgs {
    fn into_config(self) -> anyhow::Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => HarnessConfig::default(),
        };
        if let Some(trials) = self.trials {
            config.trials_per_target = trials;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if !self.targets.is_empty() {
            config.targets = self.targets;
        }
        if let Some(out) = self.out {
            config.log_path = Some(out);
        }
        if config.log_path.is_none() {
            config.log_path = Some(PathBuf::from(DEFAULT_LOG_PATH));
        }
        config.parallel |= self.parallel;
        config.record_timing |= self.timing;
        if self.max_total_trials.is_some() {
            config.max_total_trials = self.max_total_trials;
        }
        if self.deadline_secs.is_some() {
            config.deadline_secs = self.deadline_secs;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log))
        .with_writer(std::io::stderr)
        .init();

    // Target panics are captured and reported as findings; anything else is
    // a harness bug.
    std::panic::set_hook(Box::new(|info| {
        if in_target_call() {
            tracing::debug!(panic = %info, "target panicked");
        } else {
            tracing::error!(panic = %info, "harness panicked");
        }
    }));

    match dispatch(cli.cmd) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cmd: Command) -> anyhow::Result<()> {
    let scratch = tempfile::tempdir().context("creating scratch directory")?;
    let registry = TargetRegistry::builtin(scratch.path());

    match cmd {
        Command::Run(args) => {
            let config = args.into_config()?;
            let log_path = config.log_path.clone();
            let report = Orchestrator::new(&registry, config)
                .run()
                .context("fuzz run failed")?;
            print_report(&report);
            if let Some(path) = log_path {
                println!("finding log: {}", path.display());
            }
        }
        Command::Replay {
            target,
            seed,
            trial,
        } => {
            let finding = replay(&registry, &target, seed, trial, true)
                .with_context(|| format!("replaying {target} trial {trial}"))?;
            println!("target:   {}", finding.trial.target);
            println!(
                "trial:    {} (run seed {}, trial seed {})",
                finding.trial.index, finding.trial.run_seed, finding.trial.seed
            );
            println!("inputs:   {}", finding.trial.inputs.summary());
            println!("outcome:  {:?}", finding.outcome);
            println!("verdict:  {}", finding.classification());
            if let Some(rationale) = &finding.verdict.rationale {
                println!("because:  {rationale}");
            }
        }
        Command::List => {
            for target in registry.iter() {
                println!(
                    "{:<24} {:<12} {}",
                    target.name(),
                    target.profile(),
                    target.shape().describe()
                );
            }
        }
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("seed {}", report.seed);
    for target in &report.targets {
        let counts = report.summary.counts(&target.target);
        println!(
            "{:<24} trials={:<5} clean={:<5} degenerate={:<5} unexpected={:<5} stop={:?}",
            target.target,
            counts.trials,
            counts.clean,
            counts.expected_degenerate,
            counts.unexpected,
            target.stop_reason
        );
    }

    let unexpected = report.summary.total(Classification::Unexpected);
    if unexpected == 0 {
        println!("no unexpected findings");
        return;
    }
    println!("{unexpected} unexpected findings:");
    for finding in report.unexpected() {
        println!(
            "  {} #{} [{}] {}",
            finding.trial.target,
            finding.trial.index,
            finding.outcome.label(),
            finding.verdict.rationale.as_deref().unwrap_or("")
        );
        println!("      inputs: {}", finding.trial.inputs.summary());
        println!(
            "      replay: shakedown replay --target {} --seed {} --trial {}",
            finding.trial.target, finding.trial.run_seed, finding.trial.index
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["shakedown", "run"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().cmd {
            Command::Run(args) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_run_defaults() {
        let config = run_args(&[]).into_config().unwrap();
        assert_eq!(config.trials_per_target, 200);
        assert_eq!(config.log_path, Some(PathBuf::from(DEFAULT_LOG_PATH)));
        assert!(config.targets.is_empty());
        assert!(!config.parallel);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.json");
        std::fs::write(&path, r#"{"trials_per_target": 5, "seed": 1, "log_path": "a.jsonl"}"#)
            .unwrap();
        let config = run_args(&[
            "--config",
            path.to_str().unwrap(),
            "--seed",
            "42",
            "--target",
            "median",
            "--target",
            "average",
            "--out",
            "b.jsonl",
        ])
        .into_config()
        .unwrap();
        assert_eq!(config.trials_per_target, 5);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.targets, vec!["median", "average"]);
        assert_eq!(config.log_path, Some(PathBuf::from("b.jsonl")));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let err = run_args(&["--config", "/nonexistent/harness.json"])
            .into_config()
            .unwrap_err();
        assert!(format!("{err:#}").contains("harness.json"));
    }

    #[test]
    fn test_replay_requires_all_coordinates() {
        assert!(Cli::try_parse_from(["shakedown", "replay", "--target", "median"]).is_err());
        let cli = Cli::try_parse_from([
            "shakedown", "replay", "--target", "median", "--seed", "7", "--trial", "3",
        ])
        .unwrap();
        assert!(matches!(cli.cmd, Command::Replay { seed: 7, trial: 3, .. }));
    }

    #[test]
    fn test_global_log_flag() {
        let cli = Cli::try_parse_from(["shakedown", "list", "--log", "debug"]).unwrap();
        assert_eq!(cli.log, "debug");
    }
}
