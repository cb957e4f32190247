//! Engine adapter traits.

use crate::config::{ChannelProfile, ClientRole, VideoEncoderConfig};
use crate::error::EngineError;
use crate::events::EngineEventSender;
use common::secret::SecretString;
use common::types::ParticipantId;

/// Operations the call session performs on a created engine.
///
/// Every call suspends until the engine acknowledges it. Join and leave
/// report acceptance only; the outcome of a join arrives later as
/// [`crate::EngineEvent::JoinChannelSuccess`] on the event channel.
#[async_trait::async_trait]
pub trait RtcEngine: Send + Sync {
    /// Apply video encoder parameters.
    async fn configure_video(&self, config: VideoEncoderConfig) -> Result<(), EngineError>;

    /// Enable the video module.
    async fn enable_video(&self) -> Result<(), EngineError>;

    /// Select the channel profile.
    async fn set_channel_profile(&self, profile: ChannelProfile) -> Result<(), EngineError>;

    /// Declare whether the local participant publishes or only receives.
    async fn set_client_role(&self, role: ClientRole) -> Result<(), EngineError>;

    /// Join `channel` with `token`.
    ///
    /// `local_id` of [`ParticipantId::UNASSIGNED`] lets the engine choose an
    /// id, which it then reports in the join-success event.
    async fn join_channel(
        &self,
        token: &SecretString,
        channel: &str,
        info: Option<&str>,
        local_id: ParticipantId,
    ) -> Result<(), EngineError>;

    /// Leave the current channel.
    async fn leave_channel(&self) -> Result<(), EngineError>;
}

/// Creates engines bound to an app identity.
#[async_trait::async_trait]
pub trait RtcEngineFactory: Send + Sync + 'static {
    /// Engine type produced by this factory.
    type Engine: RtcEngine + 'static;

    /// Create an engine for `app_identity`. All of its callbacks go to `events`.
    async fn create(
        &self,
        app_identity: &str,
        events: EngineEventSender,
    ) -> Result<Self::Engine, EngineError>;
}
