//! Utility functions exercised by the shakedown harness.
//!
//! These are the functions under test. The harness only sees them through
//! callables registered in `shakedown-core`; nothing here knows about fuzzing.

pub mod mining;
pub mod report;

pub use mining::{days_between, dump_content_into_file, make_chunks};
pub use report::{average, median};
