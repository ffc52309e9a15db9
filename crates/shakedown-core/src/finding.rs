use std::time::Duration;

use chrono::{DateTime, Utc};
use shakedown_value::InputSet;

use crate::adapter::Outcome;
use crate::classify::{Classification, Verdict};

/// One fuzzing attempt: generated inputs for one target.
#[derive(Debug, Clone)]
pub struct Trial {
    pub target: String,
    pub target_index: u64,
    /// Monotonic within the target's run, starting at 0.
    pub index: u64,
    /// Global seed of the run. Together with `target` and `index` this is
    /// what `replay` takes.
    pub run_seed: u64,
    /// Per-trial seed the inputs were generated from.
    pub seed: u64,
    pub inputs: InputSet,
    pub timestamp: DateTime<Utc>,
}

/// A trial, what came of it, and how it was judged. Never mutated after
/// creation.
#[derive(Debug, Clone)]
pub struct Finding {
    pub trial: Trial,
    pub outcome: Outcome,
    pub verdict: Verdict,
    pub duration: Option<Duration>,
}

impl Finding {
    pub fn classification(&self) -> Classification {
        self.verdict.classification
    }

    pub fn is_unexpected(&self) -> bool {
        self.verdict.classification == Classification::Unexpected
    }
}
