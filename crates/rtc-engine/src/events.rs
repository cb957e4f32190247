//! Typed engine callbacks.
//!
//! Engines report asynchronously and often from their own threads, so the
//! sink is a non-blocking unbounded channel: [`EngineEventSender::emit`] can
//! be called from any context. The receiving side is owned by exactly one
//! session, which applies events in arrival order.

use common::types::ParticipantId;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::trace;

/// Opaque engine warning code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WarningCode(pub i32);

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{}", self.0)
    }
}

/// Opaque engine error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Why a remote participant left the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineReason {
    /// Left on purpose.
    Quit,
    /// No packets received for too long.
    Dropped,
    /// Switched from broadcaster to audience.
    BecameAudience,
    /// Code not known to this client.
    Unknown(i32),
}

impl From<i32> for OfflineReason {
    fn from(value: i32) -> Self {
        match value {
            0 => OfflineReason::Quit,
            1 => OfflineReason::Dropped,
            2 => OfflineReason::BecameAudience,
            other => OfflineReason::Unknown(other),
        }
    }
}

/// An asynchronous engine callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Non-fatal warning.
    Warning {
        /// Engine warning code.
        code: WarningCode,
    },

    /// Engine error. Not necessarily fatal to the session.
    Error {
        /// Engine error code.
        code: ErrorCode,
    },

    /// A remote participant joined (or was already present when we joined).
    UserJoined {
        /// Remote participant.
        id: ParticipantId,
        /// Time since the local join call.
        elapsed: Duration,
    },

    /// A remote participant left.
    UserOffline {
        /// Remote participant.
        id: ParticipantId,
        /// Why it left.
        reason: OfflineReason,
    },

    /// The local participant joined the channel.
    JoinChannelSuccess {
        /// Channel joined.
        channel: String,
        /// Id the engine uses for the local participant.
        id: ParticipantId,
        /// Time since the local join call.
        elapsed: Duration,
    },
}

impl EngineEvent {
    /// Returns the event kind as a string for logs and metric labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            EngineEvent::Warning { .. } => "warning",
            EngineEvent::Error { .. } => "error",
            EngineEvent::UserJoined { .. } => "user_joined",
            EngineEvent::UserOffline { .. } => "user_offline",
            EngineEvent::JoinChannelSuccess { .. } => "join_channel_success",
        }
    }
}

/// Sending side of the engine event channel.
#[derive(Debug, Clone)]
pub struct EngineEventSender(mpsc::UnboundedSender<EngineEvent>);

impl EngineEventSender {
    /// Create a connected sender/receiver pair.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    /// Deliver an event. Never blocks.
    ///
    /// Returns `false` if the receiving session is gone; the event is dropped.
    pub fn emit(&self, event: EngineEvent) -> bool {
        let kind = event.kind();
        let delivered = self.0.send(event).is_ok();
        if !delivered {
            trace!(target: "rtc_engine.events", kind, "Engine event dropped, no receiver");
        }
        delivered
    }

    /// Whether the receiving side has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}
