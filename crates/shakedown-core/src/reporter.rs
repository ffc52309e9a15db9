//! Finding log and run summary.
//!
//! The reporter owns the append-only finding log for a run. Each recorded
//! finding is written to the sink as one JSON line and flushed before
//! `record` returns, so a trial's line is on disk before the next trial is
//! generated.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use shakedown_value::InputSet;

use crate::adapter::Outcome;
use crate::classify::Classification;
use crate::error::HarnessError;
use crate::finding::Finding;
use crate::limits::StopReason;

/// Written once when the log is opened.
#[derive(Debug, Clone, Serialize)]
pub struct RunHeader {
    pub seed: u64,
    pub trials_per_target: BTreeMap<String, u64>,
}

/// Per-target counts of findings by classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TargetCounts {
    pub trials: u64,
    pub clean: u64,
    pub expected_degenerate: u64,
    pub unexpected: u64,
    pub rule_gaps: u64,
}

impl TargetCounts {
    fn add(&mut self, finding: &Finding) {
        self.trials += 1;
        match finding.classification() {
            Classification::Clean => self.clean += 1,
            Classification::ExpectedDegenerate => self.expected_degenerate += 1,
            Classification::Unexpected => self.unexpected += 1,
        }
        if finding.verdict.rule_gap {
            self.rule_gaps += 1;
        }
    }

    pub fn get(&self, classification: Classification) -> u64 {
        match classification {
            Classification::Clean => self.clean,
            Classification::ExpectedDegenerate => self.expected_degenerate,
            Classification::Unexpected => self.unexpected,
        }
    }
}

/// Counts by target and classification. Always derived from findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub per_target: BTreeMap<String, TargetCounts>,
    pub total_trials: u64,
}

impl RunSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for finding in findings {
            summary
                .per_target
                .entry(finding.trial.target.clone())
                .or_default()
                .add(finding);
            summary.total_trials += 1;
        }
        summary
    }

    pub fn counts(&self, target: &str) -> TargetCounts {
        self.per_target.get(target).copied().unwrap_or_default()
    }

    /// Total of one classification across all targets.
    pub fn total(&self, classification: Classification) -> u64 {
        self.per_target.values().map(|c| c.get(classification)).sum()
    }
}

#[derive(Serialize)]
struct TrialRecord<'a> {
    target: &'a str,
    trial: u64,
    run_seed: u64,
    trial_seed: u64,
    input_summary: String,
    outcome: &'a Outcome,
    classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    rationale: Option<&'a str>,
    rule_gap: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    inputs: Option<&'a InputSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_us: Option<u64>,
}

#[derive(Serialize)]
struct SummaryRecord<'a> {
    target: &'a str,
    #[serde(flatten)]
    counts: TargetCounts,
    stop_reason: StopReason,
}

#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum LogRecord<'a> {
    Run(&'a RunHeader),
    Trial(TrialRecord<'a>),
    Summary(SummaryRecord<'a>),
}

/// Render one finding as its log line (without trailing newline).
/// Full inputs are included for every unexpected finding.
pub fn render_finding(finding: &Finding, include_timing: bool) -> Result<String, HarnessError> {
    let trial = &finding.trial;
    let record = LogRecord::Trial(TrialRecord {
        target: &trial.target,
        trial: trial.index,
        run_seed: trial.run_seed,
        trial_seed: trial.seed,
        input_summary: trial.inputs.summary(),
        outcome: &finding.outcome,
        classification: finding.classification(),
        rationale: finding.verdict.rationale.as_deref(),
        rule_gap: finding.verdict.rule_gap,
        inputs: finding.is_unexpected().then_some(&trial.inputs),
        timestamp: include_timing.then(|| trial.timestamp.to_rfc3339()),
        duration_us: finding
            .duration
            .filter(|_| include_timing)
            .map(|d| d.as_micros() as u64),
    });
    Ok(serde_json::to_string(&record)?)
}

/// Owns the finding log for one run.
pub struct Reporter {
    findings: Vec<Finding>,
    sink: Option<BufWriter<Box<dyn Write + Send>>>,
    include_timing: bool,
}

impl Reporter {
    /// Open a reporter writing to `sink` (None = keep findings in memory
    /// only) and write the run header.
    pub fn open(
        sink: Option<Box<dyn Write + Send>>,
        header: &RunHeader,
        include_timing: bool,
    ) -> Result<Self, HarnessError> {
        let mut reporter = Self {
            findings: Vec::new(),
            sink: sink.map(BufWriter::new),
            include_timing,
        };
        reporter.write_line(&serde_json::to_string(&LogRecord::Run(header))?)?;
        Ok(reporter)
    }

    /// Open a reporter writing to a file, truncating it.
    pub fn open_file(
        path: &Path,
        header: &RunHeader,
        include_timing: bool,
    ) -> Result<Self, HarnessError> {
        let file = File::create(path).map_err(|source| HarnessError::LogDestination {
            path: path.to_path_buf(),
            source,
        })?;
        Self::open(Some(Box::new(file)), header, include_timing)
    }

    fn write_line(&mut self, line: &str) -> Result<(), HarnessError> {
        if let Some(sink) = self.sink.as_mut() {
            sink.write_all(line.as_bytes())?;
            sink.write_all(b"\n")?;
            sink.flush()?;
        }
        Ok(())
    }

    /// Append a finding: write and flush its log line, then emit a tracing
    /// event.
    pub fn record(&mut self, finding: Finding) -> Result<(), HarnessError> {
        let line = render_finding(&finding, self.include_timing)?;
        self.write_line(&line)?;

        let trial = &finding.trial;
        let rationale = finding.verdict.rationale.as_deref().unwrap_or("");
        if finding.is_unexpected() {
            tracing::warn!(
                target_name = %trial.target,
                trial = trial.index,
                run_seed = trial.run_seed,
                trial_seed = trial.seed,
                outcome = finding.outcome.label(),
                rule_gap = finding.verdict.rule_gap,
                inputs = %trial.inputs.summary(),
                "unexpected: {rationale}"
            );
        } else {
            tracing::debug!(
                target_name = %trial.target,
                trial = trial.index,
                outcome = finding.outcome.label(),
                classification = %finding.classification(),
                "{rationale}"
            );
        }

        self.findings.push(finding);
        Ok(())
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn summarize(&self) -> RunSummary {
        RunSummary::from_findings(&self.findings)
    }

    /// Write one summary record per target, flush, and hand back the
    /// finding log.
    pub fn close(mut self, stops: &[(String, StopReason)]) -> Result<Vec<Finding>, HarnessError> {
        let summary = self.summarize();
        for (target, stop_reason) in stops {
            let counts = summary.counts(target);
            let line = serde_json::to_string(&LogRecord::Summary(SummaryRecord {
                target,
                counts,
                stop_reason: *stop_reason,
            }))?;
            self.write_line(&line)?;
        }
        if let Some(mut sink) = self.sink.take() {
            sink.flush()?;
        }
        Ok(self.findings)
    }
}
