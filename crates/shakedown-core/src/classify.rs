//! Per-profile anomaly rules.
//!
//! The rules are explicit. In particular, accepting NaN from the
//! aggregators on numeric-free payloads is a documented rule for those
//! profiles, not something inferred from float semantics. Nothing in this
//! module panics: an outcome no rule covers is labelled `unexpected` with
//! `rule_gap` set so it reaches a human.

use std::fmt;

use serde::{Deserialize, Serialize};
use shakedown_value::{InputSet, Value};

use crate::adapter::Outcome;
use crate::finding::Trial;
use crate::target::{params, Profile, Target};

/// Absolute tolerance (scaled by magnitude above 1.0) for aggregator results.
pub const TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Clean,
    ExpectedDegenerate,
    Unexpected,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Classification::Clean => "clean",
            Classification::ExpectedDegenerate => "expected-degenerate",
            Classification::Unexpected => "unexpected",
        };
        f.write_str(name)
    }
}

/// A classification with its rationale.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub classification: Classification,
    pub rationale: Option<String>,
    /// Set when no rule anticipated the outcome's shape.
    pub rule_gap: bool,
}

impl Verdict {
    pub fn clean() -> Self {
        Self {
            classification: Classification::Clean,
            rationale: None,
            rule_gap: false,
        }
    }

    pub fn degenerate(rationale: impl Into<String>) -> Self {
        Self {
            classification: Classification::ExpectedDegenerate,
            rationale: Some(rationale.into()),
            rule_gap: false,
        }
    }

    pub fn unexpected(rationale: impl Into<String>) -> Self {
        Self {
            classification: Classification::Unexpected,
            rationale: Some(rationale.into()),
            rule_gap: false,
        }
    }

    pub fn rule_gap(rationale: impl Into<String>) -> Self {
        Self {
            classification: Classification::Unexpected,
            rationale: Some(format!("rule gap: {}", rationale.into())),
            rule_gap: true,
        }
    }
}

/// Judge one trial's outcome by the rules of the target's profile.
pub fn classify(target: &Target, trial: &Trial, outcome: &Outcome) -> Verdict {
    classify_profile(target.profile(), &trial.inputs, outcome)
}

pub fn classify_profile(profile: Profile, inputs: &InputSet, outcome: &Outcome) -> Verdict {
    match profile {
        Profile::Chunks => classify_chunks(inputs, outcome),
        Profile::DateDelta => classify_date_delta(inputs, outcome),
        Profile::FileDump => classify_file_dump(inputs, outcome),
        Profile::Average | Profile::Median => classify_aggregate(profile, inputs, outcome),
    }
}

fn classify_chunks(inputs: &InputSet, outcome: &Outcome) -> Verdict {
    let data = inputs.get(params::DATA).and_then(Value::as_list);
    let size = inputs.get(params::SIZE).and_then(Value::as_i64);
    let (Some(data), Some(size)) = (data, size) else {
        return Verdict::rule_gap("chunk inputs lack a `data` list or an integer `size`");
    };

    if size <= 0 {
        return match outcome {
            Outcome::ReturnedValue(Value::List(chunks)) if chunks.is_empty() => {
                Verdict::degenerate(format!("size {size} yields no chunks"))
            }
            Outcome::ReturnedValue(Value::List(chunks)) => Verdict::unexpected(format!(
                "size {size} produced {} chunks, expected none",
                chunks.len()
            )),
            Outcome::ReturnedValue(other) => {
                Verdict::rule_gap(format!("chunking returned {} instead of a list", other.kind()))
            }
            Outcome::Failed { kind, message } => Verdict::unexpected(format!(
                "{kind} on non-positive size {size}: {message}"
            )),
        };
    }

    let chunks = match outcome {
        Outcome::ReturnedValue(Value::List(chunks)) => chunks,
        Outcome::ReturnedValue(other) => {
            return Verdict::rule_gap(format!(
                "chunking returned {} instead of a list",
                other.kind()
            ))
        }
        Outcome::Failed { kind, message } => {
            return Verdict::unexpected(format!(
                "{kind} while chunking {} elements by {size}: {message}",
                data.len()
            ))
        }
    };

    let size = usize::try_from(size).unwrap_or(usize::MAX);
    let mut flattened = Vec::with_capacity(data.len());
    for (i, chunk) in chunks.iter().enumerate() {
        let Some(items) = chunk.as_list() else {
            return Verdict::rule_gap(format!("chunk {i} is {} instead of a list", chunk.kind()));
        };
        let last = i + 1 == chunks.len();
        let fits = if last {
            (1..=size).contains(&items.len())
        } else {
            items.len() == size
        };
        if !fits {
            return Verdict::unexpected(format!(
                "chunk {i} of {} has {} elements for size {size}",
                chunks.len(),
                items.len()
            ));
        }
        flattened.extend_from_slice(items);
    }

    if flattened.as_slice() != data {
        return Verdict::unexpected(format!(
            "chunk reconstruction mismatch: {} elements in, {} out",
            data.len(),
            flattened.len()
        ));
    }
    Verdict::clean()
}

fn classify_date_delta(inputs: &InputSet, outcome: &Outcome) -> Verdict {
    let start = inputs.get(params::START).and_then(Value::as_datetime);
    let end = inputs.get(params::END).and_then(Value::as_datetime);

    let (Some(start), Some(end)) = (start, end) else {
        let shape = Profile::DateDelta.shape();
        let malformed = shape.deviations(inputs).join(", ");
        return match outcome {
            Outcome::Failed { kind, message } => Verdict::degenerate(format!(
                "malformed date input `{malformed}` rejected ({kind}: {message})"
            )),
            Outcome::ReturnedValue(value) => Verdict::unexpected(format!(
                "returned {} for malformed date input `{malformed}`",
                value.brief()
            )),
        };
    };

    match outcome {
        Outcome::Failed { kind, message } => {
            Verdict::unexpected(format!("{kind} on well-formed dates: {message}"))
        }
        Outcome::ReturnedValue(Value::Int(days)) => {
            let expected = (end - start).num_days().abs();
            if *days < 0 {
                Verdict::unexpected(format!("negative delta {days} returned"))
            } else if *days != expected {
                Verdict::unexpected(format!("delta {days} differs from reference {expected}"))
            } else {
                Verdict::clean()
            }
        }
        Outcome::ReturnedValue(other) => Verdict::rule_gap(format!(
            "date delta returned {} instead of an int",
            other.kind()
        )),
    }
}

fn classify_file_dump(inputs: &InputSet, outcome: &Outcome) -> Verdict {
    let Some(content) = inputs.get(params::CONTENT).and_then(Value::as_str) else {
        return Verdict::rule_gap("file dump inputs lack a `content` string");
    };
    let expected = content.len() as i64;

    match outcome {
        Outcome::Failed { kind, message } => Verdict::unexpected(format!(
            "{kind} while writing {expected} bytes: {message}"
        )),
        Outcome::ReturnedValue(Value::Int(written)) if *written == expected => Verdict::clean(),
        Outcome::ReturnedValue(Value::Int(written)) => Verdict::unexpected(format!(
            "reported {written} bytes for a {expected}-byte payload"
        )),
        Outcome::ReturnedValue(other) => Verdict::rule_gap(format!(
            "file dump returned {} instead of a byte count",
            other.kind()
        )),
    }
}

/// Arithmetic mean; the caller guarantees `nums` is non-empty.
fn reference_mean(nums: &[f64]) -> f64 {
    nums.iter().sum::<f64>() / nums.len() as f64
}

/// Middle value of the sorted numbers, averaging the central pair for even
/// counts; the caller guarantees `nums` is non-empty.
fn reference_median(nums: &[f64]) -> f64 {
    let mut sorted = nums.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn classify_aggregate(profile: Profile, inputs: &InputSet, outcome: &Outcome) -> Verdict {
    let Some(values) = inputs.get(params::VALUES).and_then(Value::as_list) else {
        return Verdict::rule_gap(format!("{profile} inputs lack a `values` list"));
    };
    let nums: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();

    if nums.is_empty() {
        return match outcome {
            Outcome::ReturnedValue(Value::Float(x)) if x.is_nan() => Verdict::degenerate(format!(
                "NaN {profile} for a payload of {} elements without numbers",
                values.len()
            )),
            Outcome::ReturnedValue(Value::Null) => Verdict::degenerate(format!(
                "undefined {profile} for a payload without numbers"
            )),
            Outcome::ReturnedValue(other) => Verdict::unexpected(format!(
                "{profile} returned {} for a payload without numbers",
                other.brief()
            )),
            Outcome::Failed { kind, message } => Verdict::unexpected(format!(
                "{kind} on a payload without numbers: {message}"
            )),
        };
    }

    let expected = match profile {
        Profile::Median => reference_median(&nums),
        _ => reference_mean(&nums),
    };

    match outcome {
        Outcome::Failed { kind, message } => Verdict::unexpected(format!(
            "{kind} on a payload with {} numbers: {message}",
            nums.len()
        )),
        Outcome::ReturnedValue(value) => match value.as_f64() {
            Some(x) if x.is_nan() => Verdict::unexpected(format!(
                "{profile} returned NaN for a payload with {} numbers",
                nums.len()
            )),
            Some(x) if (x - expected).abs() <= TOLERANCE * expected.abs().max(1.0) => {
                Verdict::clean()
            }
            Some(x) => Verdict::unexpected(format!(
                "{profile} {x} differs from reference {expected}"
            )),
            None => Verdict::rule_gap(format!(
                "{profile} returned {} instead of a number",
                value.kind()
            )),
        },
    }
}
