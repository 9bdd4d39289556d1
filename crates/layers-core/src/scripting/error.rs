//! Scripting faults.

/// Errors raised while parsing or evaluating a script.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("method {method} expects {expected} argument(s), got {actual}")]
    Arity {
        method: String,
        expected: String,
        actual: usize,
    },

    #[error("type error: {0}")]
    Type(String),
}
