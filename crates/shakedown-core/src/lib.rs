pub mod adapter;
pub mod classify;
pub mod config;
pub mod error;
pub mod finding;
pub mod generate;
pub mod limits;
pub mod orchestrator;
pub mod registry;
pub mod reporter;
pub mod rng;
pub mod target;

pub use config::HarnessConfig;
pub use error::{HarnessError, TargetError};
pub use orchestrator::{replay, Orchestrator, RunReport};
pub use registry::TargetRegistry;
pub use target::{Profile, Target};
