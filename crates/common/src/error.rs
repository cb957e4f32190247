//! Common error types for the call session crates.

use thiserror::Error;

/// Common errors that can occur across call session components
#[derive(Error, Debug)]
pub enum CommonError {
    /// Value outside its accepted range
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Result type alias using `CommonError`
pub type Result<T> = std::result::Result<T, CommonError>;
