//! Run limits and early stopping.
//!
//! A run stops issuing trials when a target reaches its trial count, when a
//! global cap on trials across all targets is hit, or when a wall-clock
//! deadline passes. In-flight trials always finish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Limits shared by every target in a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunLimits {
    /// Maximum trials issued across all targets. None = no cap.
    pub max_total_trials: Option<u64>,
    /// Wall-clock budget for the whole run. None = no deadline.
    pub deadline: Option<Duration>,
}

/// Why a target's run loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every configured trial ran.
    Complete,
    /// The global trial cap was reached.
    TrialCapReached,
    /// The wall-clock deadline passed.
    DeadlineExceeded,
}

/// Admits trials against the run limits. Shared across worker threads.
#[derive(Debug)]
pub struct LimitChecker {
    limits: RunLimits,
    start_time: Instant,
    issued: AtomicU64,
}

impl LimitChecker {
    pub fn new(limits: RunLimits) -> Self {
        Self {
            limits,
            start_time: Instant::now(),
            issued: AtomicU64::new(0),
        }
    }

    /// Reserve one trial. Returns None if it may run, or the reason to stop.
    pub fn admit(&self) -> Option<StopReason> {
        if self.deadline_exceeded() {
            return Some(StopReason::DeadlineExceeded);
        }
        let cap = self.limits.max_total_trials;
        let reserved = self
            .issued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match cap {
                Some(cap) if n >= cap => None,
                _ => Some(n + 1),
            });
        match reserved {
            Ok(_) => None,
            Err(_) => Some(StopReason::TrialCapReached),
        }
    }

    pub fn deadline_exceeded(&self) -> bool {
        self.limits
            .deadline
            .is_some_and(|deadline| self.start_time.elapsed() >= deadline)
    }

    /// Trials admitted so far.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}
