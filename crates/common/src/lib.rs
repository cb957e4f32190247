//! Common utilities and types shared across the call session crates.

#![warn(clippy::pedantic)]

/// Module for common error types
pub mod error;

/// Module for common data types
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for join credential acquisition from the issuing service
pub mod credential;

/// Module for local participant identifier allocation
pub mod identity;
