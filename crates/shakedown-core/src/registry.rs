use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use shakedown_value::{InputSet, Value, ValueKind};

use crate::error::{HarnessError, TargetError};
use crate::target::{params, Profile, Target};

/// All targets known to the harness, in registration order.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    targets: Vec<Target>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five built-in utility targets. The file-dump target writes its
    /// files under `scratch_dir`, which must outlive the registry's use.
    pub fn builtin(scratch_dir: impl Into<PathBuf>) -> Self {
        let scratch_dir = scratch_dir.into();
        let mut registry = Self::new();
        let builtins = [
            Target::new("make_chunks", Profile::Chunks, call_make_chunks),
            Target::new("days_between", Profile::DateDelta, call_days_between),
            Target::new("dump_content_into_file", Profile::FileDump, move |inputs| {
                call_dump_content(&scratch_dir, inputs)
            }),
            Target::new("average", Profile::Average, call_average),
            Target::new("median", Profile::Median, call_median),
        ];
        for target in builtins {
            registry.targets.push(target.with_index(registry.targets.len() as u64));
        }
        registry
    }

    /// Add a target. Returns its stable index.
    pub fn register(&mut self, target: Target) -> Result<u64, HarnessError> {
        if self.get(target.name()).is_some() {
            return Err(HarnessError::DuplicateTarget(target.name().to_string()));
        }
        let index = self.targets.len() as u64;
        self.targets.push(target.with_index(index));
        Ok(index)
    }

    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name() == name)
    }

    /// Look up a target, failing with the list of known names.
    pub fn require(&self, name: &str) -> Result<&Target, HarnessError> {
        self.get(name).ok_or_else(|| HarnessError::UnknownTarget {
            name: name.to_string(),
            known: self.names().join(", "),
        })
    }

    /// Resolve a subset filter. An empty filter selects every target.
    /// The result keeps registration order regardless of filter order.
    pub fn select(&self, filter: &[String]) -> Result<Vec<&Target>, HarnessError> {
        for name in filter {
            self.require(name)?;
        }
        Ok(self
            .targets
            .iter()
            .filter(|t| filter.is_empty() || filter.iter().any(|n| n == t.name()))
            .collect())
    }

    pub fn names(&self) -> Vec<&str> {
        self.targets.iter().map(Target::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

fn arg<'a>(inputs: &'a InputSet, name: &str) -> Result<&'a Value, TargetError> {
    inputs
        .get(name)
        .ok_or_else(|| TargetError::MissingArgument(name.to_string()))
}

fn mismatch(name: &str, expected: ValueKind, found: &Value) -> TargetError {
    TargetError::TypeMismatch {
        arg: name.to_string(),
        expected,
        found: found.kind(),
    }
}

fn list_arg<'a>(inputs: &'a InputSet, name: &str) -> Result<&'a [Value], TargetError> {
    let value = arg(inputs, name)?;
    value
        .as_list()
        .ok_or_else(|| mismatch(name, ValueKind::List, value))
}

fn int_arg(inputs: &InputSet, name: &str) -> Result<i64, TargetError> {
    let value = arg(inputs, name)?;
    value
        .as_i64()
        .ok_or_else(|| mismatch(name, ValueKind::Int, value))
}

fn str_arg<'a>(inputs: &'a InputSet, name: &str) -> Result<&'a str, TargetError> {
    let value = arg(inputs, name)?;
    value
        .as_str()
        .ok_or_else(|| mismatch(name, ValueKind::Str, value))
}

fn datetime_arg(inputs: &InputSet, name: &str) -> Result<chrono::NaiveDateTime, TargetError> {
    let value = arg(inputs, name)?;
    value
        .as_datetime()
        .ok_or_else(|| mismatch(name, ValueKind::DateTime, value))
}

fn call_make_chunks(inputs: &InputSet) -> Result<Value, TargetError> {
    let data = list_arg(inputs, params::DATA)?;
    let size = int_arg(inputs, params::SIZE)?;
    let chunks = shakedown_targets::make_chunks(data, size);
    Ok(Value::List(chunks.into_iter().map(Value::List).collect()))
}

fn call_days_between(inputs: &InputSet) -> Result<Value, TargetError> {
    let start = datetime_arg(inputs, params::START)?;
    let end = datetime_arg(inputs, params::END)?;
    Ok(Value::Int(shakedown_targets::days_between(start, end)))
}

fn call_dump_content(scratch_dir: &Path, inputs: &InputSet) -> Result<Value, TargetError> {
    let content = str_arg(inputs, params::CONTENT)?;
    let file_name = str_arg(inputs, params::FILE_NAME)?;
    // Only bare file names: the target must never write outside the scratch dir.
    if Path::new(file_name).file_name() != Some(OsStr::new(file_name)) {
        return Err(TargetError::Domain(format!(
            "file name `{file_name}` is not a bare file name"
        )));
    }
    let written = shakedown_targets::dump_content_into_file(content, &scratch_dir.join(file_name))?;
    let written = i64::try_from(written)
        .map_err(|_| TargetError::Domain(format!("byte count {written} exceeds i64")))?;
    Ok(Value::Int(written))
}

fn call_average(inputs: &InputSet) -> Result<Value, TargetError> {
    let values = list_arg(inputs, params::VALUES)?;
    Ok(Value::Float(shakedown_targets::average(values)))
}

fn call_median(inputs: &InputSet) -> Result<Value, TargetError> {
    let values = list_arg(inputs, params::VALUES)?;
    Ok(Value::Float(shakedown_targets::median(values)))
}
