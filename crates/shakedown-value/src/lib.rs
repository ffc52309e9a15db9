pub mod input;
pub mod value;

pub use input::{InputSet, InputShape, Param};
pub use value::{Value, ValueKind};
