//! Error type shared by every bridge operation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// A session-scoped operation ran before `start` or after `finalize`.
    #[error("no active session")]
    NoSession,

    /// The engine returned a context without preedit text.
    #[error("context has no composition")]
    EmptyComposition,

    /// A host string cannot become a C string.
    #[error("string contains an interior NUL byte at offset {0}")]
    InteriorNul(usize),

    #[error("engine failed to create a session")]
    SessionCreation,

    /// The engine library or its API table could not be obtained.
    #[error("engine API unavailable: {0}")]
    Unavailable(String),

    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    #[error("`{op}` takes {min}..={max} arguments, got {got}")]
    Arity {
        op: &'static str,
        min: usize,
        max: usize,
        got: usize,
    },

    #[error("`{op}` argument {index} must be {expected}")]
    ArgumentType {
        op: &'static str,
        index: usize,
        expected: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
