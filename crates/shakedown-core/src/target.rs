use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shakedown_value::{InputSet, InputShape, Value, ValueKind};

use crate::error::TargetError;

/// Parameter names shared by generators, bindings and classifier rules.
pub mod params {
    pub const DATA: &str = "data";
    pub const SIZE: &str = "size";
    pub const START: &str = "start";
    pub const END: &str = "end";
    pub const CONTENT: &str = "content";
    pub const FILE_NAME: &str = "file_name";
    pub const VALUES: &str = "values";
}

/// Which input generator and which classification rules apply to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// `(data: list, size: int) -> list of lists`
    Chunks,
    /// `(start: datetime, end: datetime) -> int`
    DateDelta,
    /// `(content: str, file_name: str) -> int` (bytes written)
    FileDump,
    /// `(values: list) -> float`
    Average,
    /// `(values: list) -> float`
    Median,
}

impl Profile {
    pub fn shape(self) -> InputShape {
        match self {
            Profile::Chunks => InputShape::new()
                .param(params::DATA, ValueKind::List)
                .param(params::SIZE, ValueKind::Int),
            Profile::DateDelta => InputShape::new()
                .param(params::START, ValueKind::DateTime)
                .param(params::END, ValueKind::DateTime),
            Profile::FileDump => InputShape::new()
                .param(params::CONTENT, ValueKind::Str)
                .param(params::FILE_NAME, ValueKind::Str),
            Profile::Average | Profile::Median => {
                InputShape::new().param(params::VALUES, ValueKind::List)
            }
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Profile::Chunks => "chunks",
            Profile::DateDelta => "date_delta",
            Profile::FileDump => "file_dump",
            Profile::Average => "average",
            Profile::Median => "median",
        };
        f.write_str(name)
    }
}

/// The callable contract every target satisfies.
pub type TargetFn = dyn Fn(&InputSet) -> Result<Value, TargetError> + Send + Sync;

/// A registered function under test.
///
/// The index is assigned by the registry and feeds trial seed derivation,
/// so it stays fixed no matter which subset of targets a run selects.
#[derive(Clone)]
pub struct Target {
    index: u64,
    name: String,
    profile: Profile,
    shape: InputShape,
    callable: Arc<TargetFn>,
}

impl Target {
    pub fn new<F>(name: &str, profile: Profile, callable: F) -> Self
    where
        F: Fn(&InputSet) -> Result<Value, TargetError> + Send + Sync + 'static,
    {
        Self {
            index: 0,
            name: name.to_string(),
            profile,
            shape: profile.shape(),
            callable: Arc::new(callable),
        }
    }

    pub(crate) fn with_index(mut self, index: u64) -> Self {
        self.index = index;
        self
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn shape(&self) -> &InputShape {
        &self.shape
    }

    /// Call the target directly. Panics and errors are not intercepted here;
    /// go through [`crate::adapter::invoke`] for isolation.
    pub fn call(&self, inputs: &InputSet) -> Result<Value, TargetError> {
        (self.callable)(inputs)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("profile", &self.profile)
            .field("shape", &self.shape.describe())
            .finish_non_exhaustive()
    }
}
