use std::path::PathBuf;

use shakedown_value::ValueKind;

/// A failure raised by a target while handling one trial.
///
/// Always captured by the adapter and turned into a `Failed` outcome;
/// never propagated past it.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("type mismatch for `{arg}`: expected {expected}, found {found}")]
    TypeMismatch {
        arg: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("missing argument `{0}`")]
    MissingArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Domain(String),
}

/// A structural failure of the harness itself. Aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("unknown target `{name}` (known targets: {known})")]
    UnknownTarget { name: String, known: String },

    #[error("target `{0}` registered twice")]
    DuplicateTarget(String),

    #[error("input generator for `{target}` failed at trial {trial}: {message}")]
    Generator {
        target: String,
        trial: u64,
        message: String,
    },

    #[error("cannot open log destination {}: {source}", .path.display())]
    LogDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write finding log: {0}")]
    LogWrite(#[from] std::io::Error),

    #[error("failed to serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("reporter lock poisoned by a panicking worker")]
    ReporterPoisoned,
}
