//! Message and state types for the session actor.
//!
//! Commands use `tokio::sync::mpsc`; replies use `tokio::sync::oneshot`.

use crate::errors::SessionError;
use crate::role::{RenderSurface, RoleAssignment, RolePolicy};
use common::types::ParticipantId;
use rtc_engine::VideoEncoderConfig;
use serde::Serialize;
use std::fmt;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Lifecycle status of the call session. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No call in progress.
    Idle,
    /// Engine is being created and configured.
    Initializing,
    /// Engine is ready but the credential fetch has not resolved.
    AwaitingCredential,
    /// Join requested, waiting for the join-success event.
    Joining,
    /// In the channel.
    Joined,
    /// Leave in progress.
    Leaving,
}

impl SessionStatus {
    /// Returns the status as a string for logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Initializing => "initializing",
            SessionStatus::AwaitingCredential => "awaiting_credential",
            SessionStatus::Joining => "joining",
            SessionStatus::Joined => "joined",
            SessionStatus::Leaving => "leaving",
        }
    }

    /// Whether a call is underway (joining or joined).
    #[must_use]
    pub const fn in_call(self) -> bool {
        matches!(self, SessionStatus::Joining | SessionStatus::Joined)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State exposed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Current status.
    pub status: SessionStatus,
    /// True only once the engine reported join success.
    pub is_active: bool,
    /// Remote participants in join order.
    pub roster: Vec<ParticipantId>,
    /// Role decided at initialization.
    pub role: Option<RoleAssignment>,
    /// Local id: the engine-reported one after join, else the allocated one.
    pub local_participant_id: Option<ParticipantId>,
    /// Channel this session joins.
    pub channel_name: String,
    /// Id of the current call attempt, for log correlation.
    pub call_id: Option<Uuid>,
}

impl SessionSnapshot {
    /// Render surfaces to request, local first.
    #[must_use]
    pub fn surfaces(&self) -> Vec<RenderSurface> {
        self.role
            .map(|role| role.surfaces(&self.roster))
            .unwrap_or_default()
    }
}

/// Messages sent to `CallSessionActor`.
#[derive(Debug)]
pub enum SessionMessage {
    /// Create and configure the engine, apply the role policy.
    Initialize {
        role_policy: RolePolicy,
        video: VideoEncoderConfig,
        /// Response channel for the decided role.
        respond_to: oneshot::Sender<Result<RoleAssignment, SessionError>>,
    },

    /// Join the channel with the fetched credential.
    StartCall {
        /// Response channel for the call attempt id.
        respond_to: oneshot::Sender<Result<Uuid, SessionError>>,
    },

    /// Leave the channel and reset to idle.
    EndCall {
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Read the current state.
    GetSnapshot {
        /// Response channel for the snapshot.
        respond_to: oneshot::Sender<SessionSnapshot>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(SessionStatus::AwaitingCredential.to_string(), "awaiting_credential");
        assert_eq!(SessionStatus::Joined.as_str(), "joined");
    }

    #[test]
    fn test_in_call() {
        assert!(SessionStatus::Joining.in_call());
        assert!(SessionStatus::Joined.in_call());
        for status in [
            SessionStatus::Idle,
            SessionStatus::Initializing,
            SessionStatus::AwaitingCredential,
            SessionStatus::Leaving,
        ] {
            assert!(!status.in_call());
        }
    }

    #[test]
    fn test_snapshot_surfaces_without_role() {
        let snapshot = SessionSnapshot {
            status: SessionStatus::Idle,
            is_active: false,
            roster: vec![ParticipantId(3)],
            role: None,
            local_participant_id: None,
            channel_name: "channel-x".to_string(),
            call_id: None,
        };
        assert!(snapshot.surfaces().is_empty());

        let with_role = SessionSnapshot {
            role: Some(RolePolicy::Viewer.assign(true)),
            ..snapshot
        };
        assert_eq!(
            with_role.surfaces(),
            vec![RenderSurface::Remote(ParticipantId(3))]
        );
    }
}
