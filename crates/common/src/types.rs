//! Common data types for the call session crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric identifier of a participant in a channel.
///
/// The local participant's id is either allocated locally or assigned by the
/// engine; remote ids are always engine-reported. [`ParticipantId::UNASSIGNED`]
/// asks the engine to pick one during join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl ParticipantId {
    /// Sentinel meaning "let the engine assign an id".
    pub const UNASSIGNED: Self = Self(0);

    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this is the engine-assigns sentinel.
    #[must_use]
    pub const fn is_unassigned(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for ParticipantId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Channel identity supplied once at initialization.
///
/// Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    channel_name: String,
    app_identity: String,
}

impl ChannelDescriptor {
    /// Create a descriptor for `channel_name` under the engine app `app_identity`.
    #[must_use]
    pub fn new(channel_name: impl Into<String>, app_identity: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            app_identity: app_identity.into(),
        }
    }

    /// Name of the channel to join.
    #[must_use]
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    /// Engine app identity used when creating the engine.
    #[must_use]
    pub fn app_identity(&self) -> &str {
        &self.app_identity
    }
}
