//! Error types surfaced by the public API.

use thiserror::Error;

/// Convenience alias for fallible scheduler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A cron expression that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected 5 or 6 fields, found {found}: {expression:?}")]
    FieldCount { found: usize, expression: String },

    #[error("unrecognized descriptor: {0:?}")]
    UnknownDescriptor(String),

    #[error("empty range in {field} field")]
    EmptyRange { field: &'static str },

    #[error("unknown {field} name: {name:?}")]
    UnknownName { field: &'static str, name: String },

    #[error("invalid number {token:?} in {field} field")]
    InvalidNumber { field: &'static str, token: String },

    #[error("too many slashes: {0:?}")]
    TooManySlashes(String),

    #[error("too many hyphens: {0:?}")]
    TooManyHyphens(String),

    #[error("beginning of range ({start}) below minimum ({min}): {range:?}")]
    RangeBelowMinimum { start: u32, min: u32, range: String },

    #[error("end of range ({end}) above maximum ({max}): {range:?}")]
    RangeAboveMaximum { end: u32, max: u32, range: String },

    #[error("beginning of range ({start}) beyond end of range ({end}): {range:?}")]
    RangeInverted { start: u32, end: u32, range: String },

    #[error("step of zero not allowed: {0:?}")]
    ZeroStep(String),
}

/// Errors from [`Cron`](crate::Cron) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The submitted expression did not compile.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// `start` may only be called once, from the idle state.
    #[error("scheduler already started")]
    AlreadyStarted,

    /// The operation requires a running scheduler.
    #[error("scheduler is not running")]
    NotRunning,

    /// The scheduler has been stopped and no longer accepts work.
    #[error("scheduler is stopped")]
    Stopped,
}
