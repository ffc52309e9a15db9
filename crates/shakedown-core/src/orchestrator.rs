//! The run loop.
//!
//! Each target walks `Idle -> Running { trial_index } -> Completed`. Every
//! trial is generate -> invoke -> classify -> record, and a failing trial
//! never stops the loop: only limits or a harness failure do.

use std::collections::BTreeMap;
use std::panic;
use std::sync::Mutex;

use chrono::Utc;
use rayon::prelude::*;

use crate::adapter::invoke;
use crate::classify::{classify, Classification};
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::finding::{Finding, Trial};
use crate::generate::generate;
use crate::limits::{LimitChecker, StopReason};
use crate::registry::TargetRegistry;
use crate::reporter::{Reporter, RunHeader, RunSummary};
use crate::rng::{time_seed, trial_seed};
use crate::target::Target;

/// Lifecycle of one target within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running { trial_index: u64 },
    Completed(StopReason),
}

/// Generate, invoke and classify one trial. Does not record it.
pub fn execute_trial(
    target: &Target,
    global_seed: u64,
    trial_index: u64,
    timed: bool,
) -> Result<Finding, HarnessError> {
    let seed = trial_seed(global_seed, target.index(), trial_index);
    let profile = target.profile();
    let inputs = panic::catch_unwind(|| generate(profile, seed)).map_err(|payload| {
        HarnessError::Generator {
            target: target.name().to_string(),
            trial: trial_index,
            message: crate::adapter::panic_message(payload.as_ref()),
        }
    })?;

    let trial = Trial {
        target: target.name().to_string(),
        target_index: target.index(),
        index: trial_index,
        run_seed: global_seed,
        seed,
        inputs,
        timestamp: Utc::now(),
    };
    let invocation = invoke(target, &trial.inputs, timed);
    let verdict = classify(target, &trial, &invocation.outcome);

    Ok(Finding {
        trial,
        outcome: invocation.outcome,
        verdict,
        duration: invocation.duration,
    })
}

/// Re-run a single trial of a logged run, e.g. to reproduce an unexpected
/// finding. Nothing is written to any log.
pub fn replay(
    registry: &TargetRegistry,
    target: &str,
    global_seed: u64,
    trial_index: u64,
    timed: bool,
) -> Result<Finding, HarnessError> {
    let target = registry.require(target)?;
    execute_trial(target, global_seed, trial_index, timed)
}

/// Drives the trials of one target.
#[derive(Debug)]
pub struct TargetRunner<'a> {
    target: &'a Target,
    trials: u64,
    global_seed: u64,
    timed: bool,
    state: RunState,
}

impl<'a> TargetRunner<'a> {
    pub fn new(target: &'a Target, trials: u64, global_seed: u64, timed: bool) -> Self {
        Self {
            target,
            trials,
            global_seed,
            timed,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute the next trial, or return None once the runner has completed.
    /// A completed runner never runs again.
    pub fn step(&mut self, limits: &LimitChecker) -> Result<Option<Finding>, HarnessError> {
        let trial_index = match self.state {
            RunState::Idle => 0,
            RunState::Running { trial_index } => trial_index,
            RunState::Completed(_) => return Ok(None),
        };
        self.state = RunState::Running { trial_index };

        if trial_index >= self.trials {
            self.state = RunState::Completed(StopReason::Complete);
            return Ok(None);
        }
        if let Some(reason) = limits.admit() {
            self.state = RunState::Completed(reason);
            return Ok(None);
        }

        let finding = execute_trial(self.target, self.global_seed, trial_index, self.timed)?;
        self.state = RunState::Running {
            trial_index: trial_index + 1,
        };
        Ok(Some(finding))
    }

    /// Run to completion, recording every finding before the next trial.
    pub fn run(
        mut self,
        limits: &LimitChecker,
        reporter: &Mutex<Reporter>,
    ) -> Result<TargetReport, HarnessError> {
        let name = self.target.name();
        tracing::info!(target_name = name, trials = self.trials, "starting fuzzer");

        let mut trials_run = 0u64;
        let mut unexpected = 0u64;
        while let Some(finding) = self.step(limits)? {
            trials_run += 1;
            if finding.is_unexpected() {
                unexpected += 1;
            }
            reporter
                .lock()
                .map_err(|_| HarnessError::ReporterPoisoned)?
                .record(finding)?;
        }

        let stop_reason = match self.state {
            RunState::Completed(reason) => reason,
            _ => StopReason::Complete,
        };
        if unexpected > 0 {
            tracing::warn!(
                target_name = name,
                trials_run,
                ?stop_reason,
                "found {unexpected} potential issues"
            );
        } else {
            tracing::info!(target_name = name, trials_run, ?stop_reason, "no issues detected");
        }

        Ok(TargetReport {
            target: name.to_string(),
            trials_run,
            stop_reason,
        })
    }
}

/// How one target's run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub target: String,
    pub trials_run: u64,
    pub stop_reason: StopReason,
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub seed: u64,
    pub summary: RunSummary,
    pub targets: Vec<TargetReport>,
    /// The finding log, ordered by target then trial.
    pub findings: Vec<Finding>,
}

impl RunReport {
    pub fn unexpected(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_unexpected())
    }

    pub fn stop_reason(&self, target: &str) -> Option<StopReason> {
        self.targets
            .iter()
            .find(|t| t.target == target)
            .map(|t| t.stop_reason)
    }
}

/// One-shot driver for a whole run. `run` consumes it; repeat runs build a
/// fresh orchestrator.
pub struct Orchestrator<'a> {
    registry: &'a TargetRegistry,
    config: HarnessConfig,
    seed: u64,
}

impl<'a> Orchestrator<'a> {
    pub fn new(registry: &'a TargetRegistry, config: HarnessConfig) -> Self {
        let seed = config.seed.unwrap_or_else(time_seed);
        Self {
            registry,
            config,
            seed,
        }
    }

    /// The global seed this run uses (resolved at construction).
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn run(self) -> Result<RunReport, HarnessError> {
        let targets = self.registry.select(&self.config.targets)?;
        for name in self.config.trial_overrides.keys() {
            self.registry.require(name)?;
        }

        let header = RunHeader {
            seed: self.seed,
            trials_per_target: targets
                .iter()
                .map(|t| (t.name().to_string(), self.config.trials_for(t.name())))
                .collect::<BTreeMap<_, _>>(),
        };
        let timed = self.config.record_timing;
        let reporter = match &self.config.log_path {
            Some(path) => Reporter::open_file(path, &header, timed)?,
            None => Reporter::open(None, &header, timed)?,
        };
        let reporter = Mutex::new(reporter);
        let limits = LimitChecker::new(self.config.limits());

        tracing::info!(
            seed = self.seed,
            targets = targets.len(),
            parallel = self.config.parallel,
            "run started"
        );

        let run_one = |target: &&Target| {
            TargetRunner::new(target, self.config.trials_for(target.name()), self.seed, timed)
                .run(&limits, &reporter)
        };
        let reports: Vec<TargetReport> = if self.config.parallel {
            targets.par_iter().map(run_one).collect::<Result<Vec<_>, HarnessError>>()?
        } else {
            targets.iter().map(run_one).collect::<Result<Vec<_>, HarnessError>>()?
        };

        let reporter = reporter
            .into_inner()
            .map_err(|_| HarnessError::ReporterPoisoned)?;
        let stops: Vec<(String, StopReason)> = reports
            .iter()
            .map(|r| (r.target.clone(), r.stop_reason))
            .collect();
        let mut findings = reporter.close(&stops)?;
        findings.sort_by_key(|f| (f.trial.target_index, f.trial.index));

        let summary = RunSummary::from_findings(&findings);
        tracing::info!(
            total_trials = summary.total_trials,
            unexpected = summary.total(Classification::Unexpected),
            elapsed_secs = limits.elapsed_secs(),
            "run completed"
        );

        Ok(RunReport {
            seed: self.seed,
            summary,
            targets: reports,
            findings,
        })
    }
}
