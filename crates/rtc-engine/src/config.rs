//! Engine configuration values applied before a channel is joined.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Video capture frame rate accepted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameRate {
    /// 1 fps.
    Fps1,
    /// 7 fps.
    Fps7,
    /// 10 fps.
    Fps10,
    /// 15 fps.
    Fps15,
    /// 24 fps.
    Fps24,
    /// 30 fps.
    Fps30,
    /// 60 fps.
    Fps60,
}

impl FrameRate {
    /// Frames per second.
    #[must_use]
    pub const fn fps(self) -> u32 {
        match self {
            FrameRate::Fps1 => 1,
            FrameRate::Fps7 => 7,
            FrameRate::Fps10 => 10,
            FrameRate::Fps15 => 15,
            FrameRate::Fps24 => 24,
            FrameRate::Fps30 => 30,
            FrameRate::Fps60 => 60,
        }
    }
}

impl TryFrom<u32> for FrameRate {
    type Error = EngineError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FrameRate::Fps1),
            7 => Ok(FrameRate::Fps7),
            10 => Ok(FrameRate::Fps10),
            15 => Ok(FrameRate::Fps15),
            24 => Ok(FrameRate::Fps24),
            30 => Ok(FrameRate::Fps30),
            60 => Ok(FrameRate::Fps60),
            other => Err(EngineError::InvalidArgument(format!(
                "unsupported frame rate: {other}"
            ))),
        }
    }
}

/// Video encoder parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEncoderConfig {
    /// Capture frame rate.
    pub frame_rate: FrameRate,
}

impl Default for VideoEncoderConfig {
    fn default() -> Self {
        Self {
            frame_rate: FrameRate::Fps30,
        }
    }
}

/// Channel usage profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelProfile {
    /// Every participant sends and receives.
    Communication,
    /// Broadcasters send, the audience only receives.
    LiveBroadcasting,
}

/// Role the local participant declares to the engine.
///
/// Only meaningful under [`ChannelProfile::LiveBroadcasting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientRole {
    /// Publishes local media.
    Broadcaster,
    /// Receives only.
    Audience,
}
