use shakedown_value::Value;

fn numeric(values: &[Value]) -> Vec<f64> {
    values.iter().filter_map(Value::as_f64).collect()
}

/// Arithmetic mean of the numeric elements. Non-numeric elements are
/// ignored; NaN when there are none.
pub fn average(values: &[Value]) -> f64 {
    let nums = numeric(values);
    if nums.is_empty() {
        return f64::NAN;
    }
    nums.iter().sum::<f64>() / nums.len() as f64
}

/// Median of the numeric elements. Even counts average the two central
/// values; NaN when there are no numeric elements.
pub fn median(values: &[Value]) -> f64 {
    let mut nums = numeric(values);
    if nums.is_empty() {
        return f64::NAN;
    }
    nums.sort_by(f64::total_cmp);
    let mid = nums.len() / 2;
    if nums.len() % 2 == 0 {
        (nums[mid - 1] + nums[mid]) / 2.0
    } else {
        nums[mid]
    }
}
