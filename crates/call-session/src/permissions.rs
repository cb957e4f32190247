//! Platform media permission collaborator.
//!
//! Requested once at startup on platforms that need a runtime prompt. The
//! outcome is logged only; a denied permission surfaces later as engine
//! failures, not as a session error.

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

/// Target platform of the embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    Android,
    Ios,
    #[default]
    Desktop,
    Web,
}

impl Platform {
    /// Whether camera and microphone access needs a runtime prompt.
    #[must_use]
    pub const fn requires_runtime_permission(self) -> bool {
        matches!(self, Platform::Android)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Desktop => "desktop",
            Platform::Web => "web",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            "desktop" => Ok(Platform::Desktop),
            "web" => Ok(Platform::Web),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

/// Result of a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    Denied,
}

/// The prompt itself could not be shown.
#[derive(Debug, Error)]
#[error("Permission request failed: {0}")]
pub struct PermissionError(pub String);

/// Platform hook that asks for camera and microphone access.
#[async_trait]
pub trait MediaPermissions: Send + Sync {
    /// Prompt for camera and audio access.
    async fn request_camera_and_audio(&self) -> Result<PermissionOutcome, PermissionError>;
}

/// Permissions hook for platforms that never prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

#[async_trait]
impl MediaPermissions for NoPrompt {
    async fn request_camera_and_audio(&self) -> Result<PermissionOutcome, PermissionError> {
        Ok(PermissionOutcome::Granted)
    }
}

/// Prompt for permissions when `platform` requires it.
///
/// Returns `None` when no prompt was needed. Failures are logged and
/// reported as `None`; they never stop startup.
pub async fn request_if_required(
    platform: Platform,
    permissions: &dyn MediaPermissions,
) -> Option<PermissionOutcome> {
    if !platform.requires_runtime_permission() {
        return None;
    }

    match permissions.request_camera_and_audio().await {
        Ok(outcome) => {
            info!(
                target: "session.permissions",
                platform = %platform,
                ?outcome,
                "Media permission request completed"
            );
            Some(outcome)
        }
        Err(e) => {
            warn!(
                target: "session.permissions",
                platform = %platform,
                error = %e,
                "Media permission request failed"
            );
            None
        }
    }
}

/// Mock permissions hook for testing.
pub mod mock {
    use super::{async_trait, MediaPermissions, PermissionError, PermissionOutcome};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records prompts and answers with a fixed outcome.
    #[derive(Debug)]
    pub struct MockPermissions {
        outcome: Option<PermissionOutcome>,
        call_count: AtomicUsize,
    }

    impl MockPermissions {
        /// A hook that grants every prompt.
        #[must_use]
        pub fn granting() -> Self {
            Self {
                outcome: Some(PermissionOutcome::Granted),
                call_count: AtomicUsize::new(0),
            }
        }

        /// A hook that denies every prompt.
        #[must_use]
        pub fn denying() -> Self {
            Self {
                outcome: Some(PermissionOutcome::Denied),
                call_count: AtomicUsize::new(0),
            }
        }

        /// A hook whose prompt always fails.
        #[must_use]
        pub fn failing() -> Self {
            Self {
                outcome: None,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Number of prompts shown.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MediaPermissions for MockPermissions {
        async fn request_camera_and_audio(&self) -> Result<PermissionOutcome, PermissionError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.outcome
                .ok_or_else(|| PermissionError("prompt unavailable".to_string()))
        }
    }
}
