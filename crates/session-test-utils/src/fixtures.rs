//! Pre-configured test data.
//!
//! - Environment variable sets for `Config::from_vars`
//! - Credential receivers in each fetch state

use common::credential::{Credential, CredentialReceiver, CredentialState};
use common::secret::SecretString;
use common::types::ParticipantId;
use std::collections::HashMap;
use tokio::sync::watch;

/// App identity used by the fixtures.
pub const TEST_APP_ID: &str = "test-app-0000";

/// Environment variables for a call client under test.
#[derive(Debug, Clone)]
pub struct TestCallVars {
    vars: HashMap<String, String>,
}

impl TestCallVars {
    /// Minimal valid variables pointing at `issuer_url`.
    #[must_use]
    pub fn new(issuer_url: &str) -> Self {
        let vars = HashMap::from([
            ("CALL_APP_ID".to_string(), TEST_APP_ID.to_string()),
            (
                "CALL_CHANNEL_NAME".to_string(),
                crate::mock_issuer::DEFAULT_TEST_CHANNEL.to_string(),
            ),
            (
                "CALL_CREDENTIAL_ISSUER_URL".to_string(),
                issuer_url.to_string(),
            ),
        ]);
        Self { vars }
    }

    /// Set the channel name.
    #[must_use]
    pub fn channel(self, channel: &str) -> Self {
        self.set("CALL_CHANNEL_NAME", channel)
    }

    /// Set the role policy (`publisher`, `viewer`, `viewer-preview`).
    #[must_use]
    pub fn role_policy(self, policy: &str) -> Self {
        self.set("CALL_ROLE_POLICY", policy)
    }

    /// Use a channel-only credential and let the engine assign the id.
    #[must_use]
    pub fn shared_credential(self) -> Self {
        self.set("CALL_PERSONALIZED_CREDENTIAL", "false")
    }

    /// Set the target platform.
    #[must_use]
    pub fn platform(self, platform: &str) -> Self {
        self.set("CALL_PLATFORM", platform)
    }

    /// Set any variable.
    #[must_use]
    pub fn set(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn build(self) -> HashMap<String, String> {
        self.vars
    }
}

/// A receiver whose credential is already available.
#[must_use]
pub fn ready_credential(token: &str, channel: &str, uid: Option<u64>) -> CredentialReceiver {
    let credential = Credential::new(
        SecretString::from(token),
        channel.to_string(),
        uid.map(ParticipantId),
    );
    let (_sender, receiver) = watch::channel(CredentialState::Ready(credential));
    CredentialReceiver::from_watch_receiver(receiver)
}

/// A receiver whose fetch failed.
#[must_use]
pub fn unavailable_credential() -> CredentialReceiver {
    let (_sender, receiver) = watch::channel(CredentialState::Unavailable);
    CredentialReceiver::from_watch_receiver(receiver)
}

/// A pending fetch, resolved by the test through the returned sender.
#[must_use]
pub fn pending_credential() -> (watch::Sender<CredentialState>, CredentialReceiver) {
    let (sender, receiver) = watch::channel(CredentialState::Pending);
    (sender, CredentialReceiver::from_watch_receiver(receiver))
}

/// Resolve a pending fetch with a credential.
pub fn resolve_credential(
    sender: &watch::Sender<CredentialState>,
    token: &str,
    channel: &str,
    uid: Option<u64>,
) {
    let credential = Credential::new(
        SecretString::from(token),
        channel.to_string(),
        uid.map(ParticipantId),
    );
    sender
        .send(CredentialState::Ready(credential))
        .expect("credential receiver dropped");
}
