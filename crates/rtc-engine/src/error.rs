//! Engine adapter error type.

use thiserror::Error;

/// Failure reported by an engine operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The engine could not be created for the given app identity.
    #[error("Engine creation failed: {0}")]
    CreationFailed(String),

    /// An argument was rejected before reaching the engine.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine refused or failed the operation with an opaque code.
    #[error("Engine operation {operation} failed with code {code}")]
    OperationFailed {
        /// Name of the failed operation (e.g. `join_channel`).
        operation: &'static str,
        /// Engine-specific error code.
        code: i32,
    },
}
