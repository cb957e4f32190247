//! Call session error types.
//!
//! Every refusal is logged by the session and leaves its state unchanged.
//! Callers may inspect the returned error or ignore it; the presentation layer
//! only needs [`SessionError::client_message`].

use crate::actors::messages::SessionStatus;
use rtc_engine::EngineError;
use thiserror::Error;

/// Call session error type.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No credential is available yet, or the fetch failed.
    #[error("Credential unavailable: {0}")]
    CredentialUnavailable(String),

    /// `start_call`/`end_call` before `initialize` succeeded.
    #[error("Session not initialized")]
    NotInitialized,

    /// The operation is not allowed in the current status.
    #[error("Operation {operation} not allowed while {status}")]
    InvalidTransition {
        /// Refused operation.
        operation: &'static str,
        /// Status at the time of the call.
        status: SessionStatus,
    },

    /// The engine rejected an operation.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Startup could not build a collaborator.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The session actor is gone or did not answer.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Returns a stable error code for the presentation layer.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::CredentialUnavailable(_) => "credential_unavailable",
            SessionError::NotInitialized => "not_initialized",
            SessionError::InvalidTransition { .. } => "invalid_transition",
            SessionError::Engine(_) => "engine",
            SessionError::Config(_) => "config",
            SessionError::Internal(_) => "internal",
        }
    }

    /// Returns a user-facing message with no internal details.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            SessionError::CredentialUnavailable(_) => {
                "Unable to join yet, the call credential is not available".to_string()
            }
            SessionError::NotInitialized => "The call is not ready yet".to_string(),
            SessionError::InvalidTransition { operation, .. } => match *operation {
                "start_call" => "A call is already in progress".to_string(),
                "end_call" => "There is no call to end".to_string(),
                _ => "The call is already set up".to_string(),
            },
            SessionError::Engine(_) => "The call could not be completed".to_string(),
            SessionError::Config(_) | SessionError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SessionError::CredentialUnavailable("pending".to_string()).error_code(),
            "credential_unavailable"
        );
        assert_eq!(SessionError::NotInitialized.error_code(), "not_initialized");
        assert_eq!(
            SessionError::InvalidTransition {
                operation: "start_call",
                status: SessionStatus::Joined,
            }
            .error_code(),
            "invalid_transition"
        );
        assert_eq!(
            SessionError::Internal("gone".to_string()).error_code(),
            "internal"
        );
    }

    #[test]
    fn test_client_message_hides_internals() {
        let err = SessionError::Engine(EngineError::OperationFailed {
            operation: "join_channel",
            code: 17,
        });
        assert!(!err.client_message().contains("17"));
        assert!(err.to_string().contains("17"));

        let err = SessionError::Internal("actor mailbox closed".to_string());
        assert_eq!(err.client_message(), "An internal error occurred");
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = SessionError::InvalidTransition {
            operation: "end_call",
            status: SessionStatus::Idle,
        };
        assert_eq!(err.to_string(), "Operation end_call not allowed while idle");
        assert_eq!(err.client_message(), "There is no call to end");
    }

    #[test]
    fn test_from_engine_error() {
        let err: SessionError = EngineError::CreationFailed("no app".to_string()).into();
        assert!(matches!(err, SessionError::Engine(_)));
    }
}
