use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde::Serialize;
use shakedown_value::{InputSet, Value};

use crate::error::TargetError;
use crate::target::Target;

/// Why a target invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Wrong argument type or a missing argument.
    TypeError,
    IoError,
    /// The target rejected its inputs on its own terms.
    DomainError,
    /// The target panicked.
    Panic,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::TypeError => "type error",
            FailureKind::IoError => "I/O error",
            FailureKind::DomainError => "domain error",
            FailureKind::Panic => "panic",
        };
        f.write_str(name)
    }
}

impl From<&TargetError> for FailureKind {
    fn from(err: &TargetError) -> Self {
        match err {
            TargetError::TypeMismatch { .. } | TargetError::MissingArgument(_) => {
                FailureKind::TypeError
            }
            TargetError::Io(_) => FailureKind::IoError,
            TargetError::Domain(_) => FailureKind::DomainError,
        }
    }
}

/// The captured result of executing one trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    ReturnedValue(Value),
    Failed { kind: FailureKind, message: String },
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    /// `returned` or `failed`, for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::ReturnedValue(_) => "returned",
            Outcome::Failed { .. } => "failed",
        }
    }
}

/// An outcome plus, when requested, how long the call took.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub outcome: Outcome,
    pub duration: Option<Duration>,
}

thread_local! {
    static IN_TARGET_CALL: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is inside a target call made by [`invoke`].
/// Panic hooks use this to tell captured target panics from harness bugs.
pub fn in_target_call() -> bool {
    IN_TARGET_CALL.with(Cell::get)
}

/// Clears the in-target flag on drop, including during unwinding.
struct TargetCallGuard {
    outer: bool,
}

impl TargetCallGuard {
    fn enter() -> Self {
        Self {
            outer: IN_TARGET_CALL.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for TargetCallGuard {
    fn drop(&mut self) {
        IN_TARGET_CALL.with(|flag| flag.set(self.outer));
    }
}

/// Call `target` exactly once with `inputs`, converting any error or
/// unwinding panic into a `Failed` outcome. Never retries.
pub fn invoke(target: &Target, inputs: &InputSet, timed: bool) -> Invocation {
    let started = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let _guard = TargetCallGuard::enter();
        target.call(inputs)
    }));
    let duration = timed.then(|| started.elapsed());

    let outcome = match result {
        Ok(Ok(value)) => Outcome::ReturnedValue(value),
        Ok(Err(err)) => Outcome::Failed {
            kind: FailureKind::from(&err),
            message: err.to_string(),
        },
        Err(payload) => Outcome::Failed {
            kind: FailureKind::Panic,
            message: panic_message(payload.as_ref()),
        },
    };

    Invocation { outcome, duration }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
