use chrono::{NaiveDate, NaiveDateTime};
use shakedown_core::adapter::{invoke, FailureKind, Outcome};
use shakedown_core::classify::{classify_profile, Classification, Verdict};
use shakedown_core::target::params;
use shakedown_core::{Profile, TargetRegistry};
use shakedown_value::{InputSet, Value};

fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn ints(xs: &[i64]) -> Value {
    Value::List(xs.iter().copied().map(Value::Int).collect())
}

/// Invoke a builtin target and classify the result.
fn run_builtin(name: &str, inputs: InputSet) -> (Outcome, Verdict) {
    let dir = tempfile::tempdir().unwrap();
    let registry = TargetRegistry::builtin(dir.path());
    let target = registry.get(name).unwrap();
    let outcome = invoke(target, &inputs, false).outcome;
    let verdict = classify_profile(target.profile(), &inputs, &outcome);
    (outcome, verdict)
}

fn failed(kind: FailureKind) -> Outcome {
    Outcome::Failed {
        kind,
        message: "boom".to_string(),
    }
}

fn chunk_inputs(data: Value, size: i64) -> InputSet {
    InputSet::new()
        .with(params::DATA, data)
        .with(params::SIZE, size)
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn test_chunks_seven_by_three_is_clean() {
    let (outcome, verdict) = run_builtin("make_chunks", chunk_inputs(ints(&[1, 2, 3, 4, 5, 6, 7]), 3));

    let Outcome::ReturnedValue(Value::List(chunks)) = &outcome else {
        panic!("expected a list of chunks, got: {:?}", outcome);
    };
    let lens: Vec<usize> = chunks
        .iter()
        .map(|c| c.as_list().unwrap().len())
        .collect();
    assert_eq!(lens, vec![3, 3, 1]);
    assert_eq!(verdict.classification, Classification::Clean);
}

#[test]
fn test_chunks_size_zero_is_expected_degenerate() {
    let (outcome, verdict) = run_builtin("make_chunks", chunk_inputs(ints(&[1, 2, 3]), 0));
    assert_eq!(outcome, Outcome::ReturnedValue(Value::List(vec![])));
    assert_eq!(verdict.classification, Classification::ExpectedDegenerate);
    assert!(!verdict.rule_gap);
}

#[test]
fn test_average_without_numbers_is_expected_degenerate() {
    let payload = Value::List(vec![Value::from("a"), Value::from("b"), Value::from("c")]);
    let (outcome, verdict) = run_builtin("average", InputSet::new().with(params::VALUES, payload));

    match outcome {
        Outcome::ReturnedValue(Value::Float(x)) => assert!(x.is_nan()),
        other => panic!("expected NaN, got: {:?}", other),
    }
    assert_eq!(verdict.classification, Classification::ExpectedDegenerate);
}

#[test]
fn test_median_even_count_is_clean() {
    let (outcome, verdict) = run_builtin("median", InputSet::new().with(params::VALUES, ints(&[1, 3, 2, 4])));
    assert_eq!(outcome, Outcome::ReturnedValue(Value::Float(2.5)));
    assert_eq!(verdict.classification, Classification::Clean);
}

#[test]
fn test_days_between_leap_february_is_clean() {
    let inputs = InputSet::new()
        .with(params::START, midnight(2024, 1, 1))
        .with(params::END, midnight(2024, 3, 1));
    let (outcome, verdict) = run_builtin("days_between", inputs);
    assert_eq!(outcome, Outcome::ReturnedValue(Value::Int(60)));
    assert_eq!(verdict.classification, Classification::Clean);
}

// ── Chunk rules ──────────────────────────────────────────────────────

#[test]
fn test_chunks_failure_on_non_positive_size_is_unexpected() {
    let verdict = classify_profile(
        Profile::Chunks,
        &chunk_inputs(ints(&[1]), -1),
        &failed(FailureKind::Panic),
    );
    assert_eq!(verdict.classification, Classification::Unexpected);
    assert!(!verdict.rule_gap);
}

#[test]
fn test_chunks_non_empty_on_negative_size_is_unexpected() {
    let outcome = Outcome::ReturnedValue(Value::List(vec![ints(&[1, 2])]));
    let verdict = classify_profile(Profile::Chunks, &chunk_inputs(ints(&[1, 2]), -2), &outcome);
    assert_eq!(verdict.classification, Classification::Unexpected);
}

#[test]
fn test_chunks_reconstruction_mismatch_is_unexpected() {
    let outcome = Outcome::ReturnedValue(Value::List(vec![ints(&[1, 2, 3]), ints(&[4, 5, 6])]));
    let verdict = classify_profile(
        Profile::Chunks,
        &chunk_inputs(ints(&[1, 2, 3, 4, 5, 6, 7]), 3),
        &outcome,
    );
    assert_eq!(verdict.classification, Classification::Unexpected);
    assert!(verdict.rationale.unwrap().contains("reconstruction"));
}

#[test]
fn test_chunks_wrong_chunk_length_is_unexpected() {
    let outcome = Outcome::ReturnedValue(Value::List(vec![ints(&[1, 2]), ints(&[3, 4, 5])]));
    let verdict = classify_profile(Profile::Chunks, &chunk_inputs(ints(&[1, 2, 3, 4, 5]), 3), &outcome);
    assert_eq!(verdict.classification, Classification::Unexpected);
}

#[test]
fn test_chunks_empty_input_positive_size_is_clean() {
    let (_, verdict) = run_builtin("make_chunks", chunk_inputs(ints(&[]), 4));
    assert_eq!(verdict.classification, Classification::Clean);
}

#[test]
fn test_chunks_non_list_result_is_rule_gap() {
    let verdict = classify_profile(
        Profile::Chunks,
        &chunk_inputs(ints(&[1, 2]), 1),
        &Outcome::ReturnedValue(Value::Int(2)),
    );
    assert_eq!(verdict.classification, Classification::Unexpected);
    assert!(verdict.rule_gap);
    assert!(verdict.rationale.unwrap().starts_with("rule gap"));
}

#[test]
fn test_missing_inputs_is_rule_gap() {
    let verdict = classify_profile(
        Profile::Chunks,
        &InputSet::new(),
        &Outcome::ReturnedValue(Value::List(vec![])),
    );
    assert!(verdict.rule_gap);
    assert_eq!(verdict.classification, Classification::Unexpected);
}

// ── Date rules ───────────────────────────────────────────────────────

#[test]
fn test_malformed_date_rejection_is_expected_degenerate() {
    let inputs = InputSet::new()
        .with(params::START, "not a date")
        .with(params::END, midnight(2024, 3, 1));
    let (outcome, verdict) = run_builtin("days_between", inputs);
    assert!(matches!(
        outcome,
        Outcome::Failed {
            kind: FailureKind::TypeError,
            ..
        }
    ));
    assert_eq!(verdict.classification, Classification::ExpectedDegenerate);
    let rationale = verdict.rationale.unwrap();
    assert!(rationale.contains("`start`"), "{rationale}");
    assert!(!rationale.contains("`end`"), "{rationale}");
}

#[test]
fn test_value_for_malformed_date_is_unexpected() {
    let inputs = InputSet::new()
        .with(params::START, Value::Null)
        .with(params::END, Value::Null);
    let verdict = classify_profile(Profile::DateDelta, &inputs, &Outcome::ReturnedValue(Value::Int(0)));
    assert_eq!(verdict.classification, Classification::Unexpected);
    assert!(verdict.rationale.unwrap().contains("`start, end`"));
}

#[test]
fn test_failure_on_well_formed_dates_is_unexpected() {
    let inputs = InputSet::new()
        .with(params::START, midnight(2000, 1, 1))
        .with(params::END, midnight(2000, 1, 2));
    let verdict = classify_profile(Profile::DateDelta, &inputs, &failed(FailureKind::DomainError));
    assert_eq!(verdict.classification, Classification::Unexpected);
}

#[test]
fn test_negative_delta_is_unexpected() {
    let inputs = InputSet::new()
        .with(params::START, midnight(2000, 1, 2))
        .with(params::END, midnight(2000, 1, 1));
    let verdict = classify_profile(Profile::DateDelta, &inputs, &Outcome::ReturnedValue(Value::Int(-1)));
    assert_eq!(verdict.classification, Classification::Unexpected);
    assert!(verdict.rationale.unwrap().contains("negative"));
}

#[test]
fn test_reversed_dates_are_clean() {
    let inputs = InputSet::new()
        .with(params::START, midnight(2021, 6, 1))
        .with(params::END, midnight(2021, 5, 1));
    let (outcome, verdict) = run_builtin("days_between", inputs);
    assert_eq!(outcome, Outcome::ReturnedValue(Value::Int(31)));
    assert_eq!(verdict.classification, Classification::Clean);
}

// ── File dump rules ──────────────────────────────────────────────────

#[test]
fn test_dump_multibyte_content_is_clean() {
    let inputs = InputSet::new()
        .with(params::CONTENT, "héllo 🦀")
        .with(params::FILE_NAME, "fuzz-1.txt");
    let (outcome, verdict) = run_builtin("dump_content_into_file", inputs);
    assert_eq!(outcome, Outcome::ReturnedValue(Value::Int("héllo 🦀".len() as i64)));
    assert_eq!(verdict.classification, Classification::Clean);
}

#[test]
fn test_dump_size_mismatch_is_unexpected() {
    let inputs = InputSet::new()
        .with(params::CONTENT, "héllo")
        .with(params::FILE_NAME, "fuzz-2.txt");
    let verdict = classify_profile(Profile::FileDump, &inputs, &Outcome::ReturnedValue(Value::Int(5)));
    assert_eq!(verdict.classification, Classification::Unexpected);
}

#[test]
fn test_dump_failure_is_unexpected() {
    let inputs = InputSet::new()
        .with(params::CONTENT, "")
        .with(params::FILE_NAME, "fuzz-3.txt");
    let verdict = classify_profile(Profile::FileDump, &inputs, &failed(FailureKind::IoError));
    assert_eq!(verdict.classification, Classification::Unexpected);
}

// ── Aggregate rules ──────────────────────────────────────────────────

#[test]
fn test_average_of_mixed_payload_is_clean() {
    let payload = Value::List(vec![
        Value::Int(10),
        Value::from("noise"),
        Value::Float(0.25),
        Value::Null,
        Value::from(""),
    ]);
    let (outcome, verdict) = run_builtin("average", InputSet::new().with(params::VALUES, payload));
    assert_eq!(outcome, Outcome::ReturnedValue(Value::Float(5.125)));
    assert_eq!(verdict.classification, Classification::Clean);
}

#[test]
fn test_aggregate_mismatch_is_unexpected() {
    let inputs = InputSet::new().with(params::VALUES, ints(&[1, 2, 3]));
    let verdict = classify_profile(Profile::Average, &inputs, &Outcome::ReturnedValue(Value::Float(2.1)));
    assert_eq!(verdict.classification, Classification::Unexpected);

    let verdict = classify_profile(Profile::Median, &inputs, &Outcome::ReturnedValue(Value::Float(2.0)));
    assert_eq!(verdict.classification, Classification::Clean);
}

#[test]
fn test_aggregate_within_tolerance_is_clean() {
    let inputs = InputSet::new().with(params::VALUES, ints(&[1, 2]));
    let outcome = Outcome::ReturnedValue(Value::Float(1.5 + 1e-12));
    let verdict = classify_profile(Profile::Average, &inputs, &outcome);
    assert_eq!(verdict.classification, Classification::Clean);
}

#[test]
fn test_nan_with_numbers_is_unexpected() {
    let inputs = InputSet::new().with(params::VALUES, ints(&[4]));
    let verdict = classify_profile(Profile::Median, &inputs, &Outcome::ReturnedValue(Value::Float(f64::NAN)));
    assert_eq!(verdict.classification, Classification::Unexpected);
}

#[test]
fn test_number_without_numbers_is_unexpected() {
    let inputs = InputSet::new().with(params::VALUES, Value::List(vec![]));
    let verdict = classify_profile(Profile::Average, &inputs, &Outcome::ReturnedValue(Value::Float(0.0)));
    assert_eq!(verdict.classification, Classification::Unexpected);
}

#[test]
fn test_undefined_without_numbers_is_expected_degenerate() {
    let inputs = InputSet::new().with(params::VALUES, Value::List(vec![Value::Null]));
    let verdict = classify_profile(Profile::Median, &inputs, &Outcome::ReturnedValue(Value::Null));
    assert_eq!(verdict.classification, Classification::ExpectedDegenerate);
}

#[test]
fn test_failure_without_numbers_is_unexpected() {
    let inputs = InputSet::new().with(params::VALUES, Value::List(vec![]));
    let verdict = classify_profile(Profile::Average, &inputs, &failed(FailureKind::Panic));
    assert_eq!(verdict.classification, Classification::Unexpected);
    assert!(!verdict.rule_gap);
}

#[test]
fn test_non_numeric_result_is_rule_gap() {
    let inputs = InputSet::new().with(params::VALUES, ints(&[1]));
    let verdict = classify_profile(Profile::Average, &inputs, &Outcome::ReturnedValue(Value::from("1")));
    assert!(verdict.rule_gap);
}

#[test]
fn test_classification_display() {
    assert_eq!(Classification::Clean.to_string(), "clean");
    assert_eq!(Classification::ExpectedDegenerate.to_string(), "expected-degenerate");
    assert_eq!(Classification::Unexpected.to_string(), "unexpected");
}
