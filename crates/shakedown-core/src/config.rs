use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::limits::RunLimits;

/// Trials per target when nothing else is configured.
pub const DEFAULT_TRIALS_PER_TARGET: u64 = 200;

/// Harness configuration. Every field has a default, so a partial JSON
/// file (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub trials_per_target: u64,
    /// Per-target trial counts that override `trials_per_target`.
    pub trial_overrides: BTreeMap<String, u64>,
    /// Global seed. None = time-based.
    pub seed: Option<u64>,
    /// Targets to run. Empty = all registered targets.
    pub targets: Vec<String>,
    /// JSON-lines finding log. None = in-memory only.
    pub log_path: Option<PathBuf>,
    /// Run targets on separate worker threads.
    pub parallel: bool,
    pub max_total_trials: Option<u64>,
    pub deadline_secs: Option<u64>,
    /// Record per-trial wall-clock timing and timestamps in the log.
    /// Off by default so that equal seeds give byte-identical logs.
    pub record_timing: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            trials_per_target: DEFAULT_TRIALS_PER_TARGET,
            trial_overrides: BTreeMap::new(),
            seed: None,
            targets: Vec::new(),
            log_path: None,
            parallel: false,
            max_total_trials: None,
            deadline_secs: None,
            record_timing: false,
        }
    }
}

impl HarnessConfig {
    pub fn from_json_str(json: &str) -> Result<Self, HarnessError> {
        serde_json::from_str(json).map_err(|e| HarnessError::Config(e.to_string()))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, HarnessError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Trial count for one target, honoring overrides.
    pub fn trials_for(&self, target: &str) -> u64 {
        self.trial_overrides
            .get(target)
            .copied()
            .unwrap_or(self.trials_per_target)
    }

    pub fn limits(&self) -> RunLimits {
        RunLimits {
            max_total_trials: self.max_total_trials,
            deadline: self.deadline_secs.map(Duration::from_secs),
        }
    }
}
