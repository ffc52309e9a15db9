//! Seeded input generators, one per target profile.
//!
//! Each generator mixes well-formed inputs with the boundary and garbage
//! variants its target is expected to survive: empty containers,
//! non-positive sizes, malformed dates, numeric-free payloads.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use shakedown_value::{InputSet, Value};

use crate::rng::trial_rng;
use crate::target::{params, Profile};

/// Longest list handed to the chunking target.
pub const MAX_CHUNK_INPUT_LEN: usize = 40;
/// Longest payload handed to the numeric aggregators.
pub const MAX_NUMERIC_PAYLOAD_LEN: usize = 20;
/// Longest ASCII payload handed to the file-dump target.
pub const MAX_DUMP_CONTENT_LEN: usize = 2048;

const MULTIBYTE_CHARS: [char; 6] = ['é', 'ß', 'ж', '中', '🦀', '\u{2028}'];

const MALFORMED_DATES: [&str; 4] = ["2024-13-45", "not a date", "", "01/02/2003"];

/// Generate the inputs for one trial. Pure: the same seed always yields
/// the same `InputSet`.
pub fn generate(profile: Profile, seed: u64) -> InputSet {
    let mut rng = trial_rng(seed);
    match profile {
        Profile::Chunks => chunk_inputs(&mut rng),
        Profile::DateDelta => date_inputs(&mut rng),
        Profile::FileDump => dump_inputs(&mut rng),
        Profile::Average | Profile::Median => {
            InputSet::new().with(params::VALUES, Value::List(numeric_payload(&mut rng)))
        }
    }
}

fn noise_value(rng: &mut ChaCha8Rng) -> Value {
    match rng.gen_range(0..3) {
        0 => Value::from(""),
        1 => Value::Null,
        _ => Value::from("noise"),
    }
}

fn chunk_inputs(rng: &mut ChaCha8Rng) -> InputSet {
    let len = rng.gen_range(0..=MAX_CHUNK_INPUT_LEN);
    let mixed = rng.gen_bool(0.1);
    let mut data = Vec::with_capacity(len);
    for _ in 0..len {
        if mixed && rng.gen_bool(0.3) {
            data.push(noise_value(rng));
        } else {
            data.push(Value::Int(rng.gen_range(-1000..=1000)));
        }
    }

    let len = len as i64;
    let size = match rng.gen_range(0..6) {
        0 => 0,
        1 => -1,
        2 => rng.gen_range(-1000..=-2),
        3 => len + rng.gen_range(1..=10),
        _ => rng.gen_range(1..=len.max(1)),
    };

    InputSet::new()
        .with(params::DATA, Value::List(data))
        .with(params::SIZE, size)
}

fn random_datetime(rng: &mut ChaCha8Rng) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(
        rng.gen_range(1990..=2030),
        rng.gen_range(1..=12),
        rng.gen_range(1..=28),
    )
    .and_then(|d| d.and_hms_opt(rng.gen_range(0..=23), rng.gen_range(0..=59), 0))
    .unwrap_or_default()
}

fn malformed_date(rng: &mut ChaCha8Rng) -> Value {
    match rng.gen_range(0..3) {
        0 => Value::Int(rng.gen_range(-100_000..=100_000)),
        1 => Value::Null,
        _ => Value::from(*MALFORMED_DATES.choose(rng).unwrap_or(&"")),
    }
}

fn date_inputs(rng: &mut ChaCha8Rng) -> InputSet {
    let start = random_datetime(rng);
    let delta = Duration::days(rng.gen_range(-1000..=1000));
    let end = start.checked_add_signed(delta).unwrap_or(start);

    let mut start = Value::DateTime(start);
    let mut end = Value::DateTime(end);
    if rng.gen_ratio(1, 8) {
        match rng.gen_range(0..3) {
            0 => start = malformed_date(rng),
            1 => end = malformed_date(rng),
            _ => {
                start = malformed_date(rng);
                end = malformed_date(rng);
            }
        }
    }

    InputSet::new()
        .with(params::START, start)
        .with(params::END, end)
}

fn dump_inputs(rng: &mut ChaCha8Rng) -> InputSet {
    let content: String = match rng.gen_range(0..10) {
        0 => String::new(),
        1 => {
            let len = rng.gen_range(1..=64);
            let mut s = String::new();
            for _ in 0..len {
                s.push(*MULTIBYTE_CHARS.choose(rng).unwrap_or(&'?'));
            }
            s
        }
        _ => {
            let len = rng.gen_range(0..=MAX_DUMP_CONTENT_LEN);
            (0..len)
                .map(|_| char::from(rng.gen_range(32u8..=126)))
                .collect()
        }
    };
    let file_name = format!("fuzz-{}.txt", rng.gen_range(0..=999_999));

    InputSet::new()
        .with(params::CONTENT, content)
        .with(params::FILE_NAME, file_name)
}

fn numeric_element(rng: &mut ChaCha8Rng) -> Value {
    match rng.gen_range(0..5) {
        0 => Value::Int(rng.gen_range(-1000..=1000)),
        1 => {
            let scale = rng.gen_range(-10..=10) as f64;
            Value::Float(rng.gen::<f64>() * scale)
        }
        2 => Value::from(""),
        3 => Value::Null,
        _ => Value::from("noise"),
    }
}

fn numeric_payload(rng: &mut ChaCha8Rng) -> Vec<Value> {
    match rng.gen_range(0..10) {
        0 => Vec::new(),
        1 => {
            let len = rng.gen_range(1..=MAX_NUMERIC_PAYLOAD_LEN);
            (0..len).map(|_| noise_value(rng)).collect()
        }
        _ => {
            let len = rng.gen_range(0..=MAX_NUMERIC_PAYLOAD_LEN);
            (0..len).map(|_| numeric_element(rng)).collect()
        }
    }
}
