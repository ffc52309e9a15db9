use std::collections::BTreeMap;

use serde::Serialize;

use crate::value::{Value, ValueKind};

/// A concrete assignment of values to a target's parameters.
/// Uses BTreeMap so iteration and serialization order are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct InputSet {
    pub assignments: BTreeMap<String, Value>,
}

impl InputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.assignments.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.assignments.get(name)
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// One-line `name=value` rendering using [`Value::brief`].
    pub fn summary(&self) -> String {
        self.assignments
            .iter()
            .map(|(name, value)| format!("{name}={}", value.brief()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One named, typed parameter of a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    pub kind: ValueKind,
}

/// The nominal parameter shape of a target: arity plus coarse types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputShape {
    pub params: Vec<Param>,
}

impl InputShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: &str, kind: ValueKind) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            kind,
        });
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether every parameter is present with its nominal kind.
    pub fn conforms(&self, inputs: &InputSet) -> bool {
        self.params
            .iter()
            .all(|p| inputs.get(&p.name).map(Value::kind) == Some(p.kind))
    }

    /// Parameters whose value is missing or of the wrong kind.
    pub fn deviations<'a>(&'a self, inputs: &InputSet) -> Vec<&'a str> {
        self.params
            .iter()
            .filter(|p| inputs.get(&p.name).map(Value::kind) != Some(p.kind))
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Human-readable signature, e.g. `(data: list, size: int)`.
    pub fn describe(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.kind))
            .collect();
        format!("({})", params.join(", "))
    }
}
