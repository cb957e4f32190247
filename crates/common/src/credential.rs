//! Join credential acquisition from the credential issuer.
//!
//! A credential is an opaque, time-bounded token that the engine requires to
//! join a channel. It is requested with a plain HTTP GET:
//!
//! ```text
//! GET <issuer>/access_token?channel=<name>[&uid=<id>]
//! 200 {"token": "<opaque>"}
//! ```
//!
//! Any other status or body shape is a failure. Expiry is enforced by the
//! issuer only and is not tracked here.
//!
//! # Background acquisition
//!
//! [`spawn_credential_fetch`] runs a single fetch on its own task and
//! publishes the outcome through a `tokio::sync::watch` channel wrapped in
//! [`CredentialReceiver`]. It returns immediately: callers read
//! [`CredentialReceiver::current`] when they need the credential and must
//! treat `None` as "not available", whether the fetch is still running or
//! has failed. There is no retry and no cancellation.
//!
//! ```rust,ignore
//! use common::credential::{spawn_credential_fetch, CredentialProvider, CredentialProviderConfig};
//!
//! let provider = CredentialProvider::new(CredentialProviderConfig::new(
//!     "https://issuer.example.com".to_string(),
//! ))?;
//! let (_task, credential_rx) = spawn_credential_fetch(provider, "channel-x".to_string(), None);
//!
//! // Later, right before joining:
//! if let Some(credential) = credential_rx.current() {
//!     // join with credential.token()
//! }
//! ```
//!
//! # Security
//!
//! - Tokens are held as `SecretString` and never logged
//! - Error bodies from the issuer are logged at trace level only
//! - HTTP timeouts bound how long a single request can take

use crate::secret::SecretString;
use crate::types::ParticipantId;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

// =============================================================================
// Constants
// =============================================================================

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout for the HTTP client.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Path of the issuing endpoint, relative to the issuer base URL.
const ACCESS_TOKEN_PATH: &str = "/access_token";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while acquiring a credential.
#[derive(Error, Debug, Clone)]
pub enum CredentialError {
    /// Request could not be sent or no response arrived.
    #[error("HTTP client error: {0}")]
    HttpError(String),

    /// Issuer refused the request (4xx).
    #[error("Credential request rejected: {0}")]
    Rejected(String),

    /// Issuer failed (5xx).
    #[error("Issuer error: {0}")]
    IssuerError(String),

    /// Body was not `{"token": "<non-empty string>"}`.
    #[error("Invalid credential response: {0}")]
    InvalidResponse(String),

    /// Client could not be configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Watch channel closed unexpectedly.
    #[error("Credential channel closed")]
    ChannelClosed,
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the credential provider.
#[derive(Debug, Clone)]
pub struct CredentialProviderConfig {
    /// Issuer base URL (e.g., `https://issuer.example.com`).
    pub issuer_url: String,

    /// HTTP request timeout.
    pub http_timeout: Duration,
}

impl CredentialProviderConfig {
    /// Create a new configuration with the default timeout.
    #[must_use]
    pub fn new(issuer_url: String) -> Self {
        Self {
            issuer_url,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    fn access_token_url(&self) -> String {
        format!(
            "{}{ACCESS_TOKEN_PATH}",
            self.issuer_url.trim_end_matches('/')
        )
    }
}

// =============================================================================
// Credential
// =============================================================================

/// A join credential issued for one channel.
///
/// In the personalized variant the credential is bound to the participant id
/// it was requested for; joining with a different id will be refused by the
/// engine.
#[derive(Debug, Clone)]
pub struct Credential {
    token: SecretString,
    channel: String,
    participant: Option<ParticipantId>,
    issued_at: DateTime<Utc>,
}

impl Credential {
    /// Build a credential from its parts.
    #[must_use]
    pub fn new(token: SecretString, channel: String, participant: Option<ParticipantId>) -> Self {
        Self {
            token,
            channel,
            participant,
            issued_at: Utc::now(),
        }
    }

    /// The opaque token passed to the engine's join call.
    #[must_use]
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    /// Channel the credential was issued for.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Participant the credential is bound to, if personalized.
    #[must_use]
    pub fn participant(&self) -> Option<ParticipantId> {
        self.participant
    }

    /// When the issuer response was received.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

// =============================================================================
// Issuer Response
// =============================================================================

#[derive(Deserialize)]
struct IssuerResponse {
    token: String,
}

impl std::fmt::Debug for IssuerResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerResponse")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Credential Provider
// =============================================================================

/// HTTP client for the credential issuer.
#[derive(Debug, Clone)]
pub struct CredentialProvider {
    config: CredentialProviderConfig,
    http_client: reqwest::Client,
}

impl CredentialProvider {
    /// Create a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: CredentialProviderConfig) -> Result<Self, CredentialError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                CredentialError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Issuer base URL this provider talks to.
    #[must_use]
    pub fn issuer_url(&self) -> &str {
        &self.config.issuer_url
    }

    /// Request a credential for `channel`, optionally bound to `participant`.
    ///
    /// # Errors
    ///
    /// - `CredentialError::HttpError` - network failure or timeout
    /// - `CredentialError::Rejected` - issuer returned 4xx
    /// - `CredentialError::IssuerError` - issuer returned 5xx or another non-success status
    /// - `CredentialError::InvalidResponse` - body missing a non-empty `token`
    #[instrument(skip_all, fields(channel = %channel))]
    pub async fn fetch_credential(
        &self,
        channel: &str,
        participant: Option<ParticipantId>,
    ) -> Result<Credential, CredentialError> {
        let url = self.config.access_token_url();

        let mut query: Vec<(&str, String)> = vec![("channel", channel.to_string())];
        if let Some(id) = participant {
            query.push(("uid", id.to_string()));
        }

        debug!(
            target: "common.credential",
            url = %url,
            personalized = participant.is_some(),
            "Requesting credential from issuer"
        );

        let response = self
            .http_client
            .get(&url)
            .query(&query)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                debug!(target: "common.credential", error = %e, "HTTP request failed");
                CredentialError::HttpError(e.to_string())
            })?;

        let status = response.status();

        if status.is_success() {
            let body = response.text().await.map_err(|e| {
                warn!(target: "common.credential", error = %e, "Failed to read issuer response");
                CredentialError::InvalidResponse(e.to_string())
            })?;

            let parsed: IssuerResponse = serde_json::from_str(&body).map_err(|e| {
                warn!(target: "common.credential", error = %e, "Failed to parse issuer response");
                CredentialError::InvalidResponse(e.to_string())
            })?;

            if parsed.token.is_empty() {
                warn!(target: "common.credential", "Issuer returned an empty token");
                return Err(CredentialError::InvalidResponse(
                    "token field is empty".to_string(),
                ));
            }

            Ok(Credential::new(
                SecretString::from(parsed.token),
                channel.to_string(),
                participant,
            ))
        } else {
            let body = response.text().await.unwrap_or_else(|e| {
                trace!(target: "common.credential", error = %e, "Failed to read error response body");
                "<failed to read body>".to_string()
            });
            trace!(
                target: "common.credential",
                body = %body,
                "Issuer error response body"
            );

            if status.is_client_error() {
                warn!(target: "common.credential", status = %status, "Issuer rejected credential request");
                Err(CredentialError::Rejected(format!("Status {status}")))
            } else {
                warn!(target: "common.credential", status = %status, "Issuer returned an error");
                Err(CredentialError::IssuerError(format!("Status {status}")))
            }
        }
    }
}

// =============================================================================
// Background Acquisition
// =============================================================================

/// Progress of a background credential fetch.
#[derive(Debug, Clone)]
pub enum CredentialState {
    /// The fetch has not resolved yet.
    Pending,
    /// The issuer returned a credential.
    Ready(Credential),
    /// The fetch failed; the credential will not become available.
    Unavailable,
}

/// Read side of a background credential fetch.
///
/// Cloning is cheap; every clone observes the same fetch.
#[derive(Clone)]
pub struct CredentialReceiver(watch::Receiver<CredentialState>);

impl CredentialReceiver {
    /// Wrap an existing watch receiver.
    ///
    /// Useful when the credential comes from somewhere other than
    /// [`spawn_credential_fetch`], e.g. a test or a preloaded token.
    #[must_use]
    pub fn from_watch_receiver(receiver: watch::Receiver<CredentialState>) -> Self {
        Self(receiver)
    }

    /// The credential, if the fetch has succeeded.
    ///
    /// Never waits. Clones so the borrow is released immediately.
    #[must_use]
    pub fn current(&self) -> Option<Credential> {
        match &*self.0.borrow() {
            CredentialState::Ready(credential) => Some(credential.clone()),
            CredentialState::Pending | CredentialState::Unavailable => None,
        }
    }

    /// Whether the fetch is still outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(*self.0.borrow(), CredentialState::Pending)
    }

    /// Current state of the fetch.
    #[must_use]
    pub fn state(&self) -> CredentialState {
        self.0.borrow().clone()
    }

    /// Wait for the state to change.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::ChannelClosed` once the fetch task has
    /// finished and no further change can happen.
    pub async fn changed(&mut self) -> Result<(), CredentialError> {
        self.0
            .changed()
            .await
            .map_err(|_| CredentialError::ChannelClosed)
    }
}

impl std::fmt::Debug for CredentialReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.0.borrow() {
            CredentialState::Pending => "pending",
            CredentialState::Ready(_) => "ready",
            CredentialState::Unavailable => "unavailable",
        };
        f.debug_struct("CredentialReceiver")
            .field("state", &state)
            .finish()
    }
}

/// Spawn a single background credential fetch.
///
/// Returns immediately with the task handle and a receiver in the
/// [`CredentialState::Pending`] state. On failure the error is logged and the
/// state becomes [`CredentialState::Unavailable`]; nothing is retried.
#[must_use]
pub fn spawn_credential_fetch(
    provider: CredentialProvider,
    channel: String,
    participant: Option<ParticipantId>,
) -> (JoinHandle<()>, CredentialReceiver) {
    let (sender, receiver) = watch::channel(CredentialState::Pending);

    let task_handle = tokio::spawn(async move {
        let state = match provider.fetch_credential(&channel, participant).await {
            Ok(credential) => {
                info!(
                    target: "common.credential",
                    channel = %channel,
                    personalized = participant.is_some(),
                    "Credential acquired"
                );
                CredentialState::Ready(credential)
            }
            Err(e) => {
                warn!(
                    target: "common.credential",
                    channel = %channel,
                    error = %e,
                    "Credential fetch failed, join will be refused"
                );
                CredentialState::Unavailable
            }
        };

        if sender.send(state).is_err() {
            debug!(
                target: "common.credential",
                "All credential receivers dropped before the fetch resolved"
            );
        }
    });

    (task_handle, CredentialReceiver(receiver))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::secret::ExposeSecret;
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> CredentialProvider {
        CredentialProvider::new(CredentialProviderConfig::new(server.uri())).unwrap()
    }

    // =========================================================================
    // Configuration Tests
    // =========================================================================

    #[test]
    fn test_config_defaults() {
        let config = CredentialProviderConfig::new("http://localhost:8080".to_string());
        assert_eq!(config.http_timeout, DEFAULT_HTTP_TIMEOUT);

        let config = config.with_http_timeout(Duration::from_secs(3));
        assert_eq!(config.http_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_access_token_url_trims_trailing_slash() {
        let config = CredentialProviderConfig::new("https://issuer.example.com/".to_string());
        assert_eq!(
            config.access_token_url(),
            "https://issuer.example.com/access_token"
        );
    }

    #[test]
    fn test_credential_debug_redacts_token() {
        let credential = Credential::new(
            SecretString::from("very-secret-token"),
            "channel-x".to_string(),
            Some(ParticipantId(42)),
        );

        let debug_str = format!("{credential:?}");
        assert!(!debug_str.contains("very-secret-token"));
        assert!(debug_str.contains("channel-x"));
    }

    // =========================================================================
    // Fetch Tests
    // =========================================================================

    #[tokio::test]
    async fn test_fetch_personalized_credential() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/access_token"))
            .and(query_param("channel", "channel-x"))
            .and(query_param("uid", "1234567890"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "abc"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let credential = provider_for(&mock_server)
            .fetch_credential("channel-x", Some(ParticipantId(1_234_567_890)))
            .await
            .unwrap();

        assert_eq!(credential.token().expose_secret(), "abc");
        assert_eq!(credential.channel(), "channel-x");
        assert_eq!(credential.participant(), Some(ParticipantId(1_234_567_890)));
    }

    #[tokio::test]
    async fn test_fetch_channel_credential_omits_uid() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/access_token"))
            .and(query_param("channel", "channel-x"))
            .and(query_param_is_missing("uid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "shared"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let credential = provider_for(&mock_server)
            .fetch_credential("channel-x", None)
            .await
            .unwrap();

        assert_eq!(credential.token().expose_secret(), "shared");
        assert_eq!(credential.participant(), None);
    }

    #[tokio::test]
    async fn test_fetch_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/access_token"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let result = provider_for(&mock_server)
            .fetch_credential("channel-x", None)
            .await;

        assert!(matches!(result, Err(CredentialError::IssuerError(_))));
    }

    #[tokio::test]
    async fn test_fetch_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/access_token"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let result = provider_for(&mock_server)
            .fetch_credential("channel-x", None)
            .await;

        assert!(matches!(result, Err(CredentialError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_fetch_missing_token_field() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "wrong-field"
            })))
            .mount(&mock_server)
            .await;

        let result = provider_for(&mock_server)
            .fetch_credential("channel-x", None)
            .await;

        assert!(matches!(result, Err(CredentialError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_fetch_empty_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": ""
            })))
            .mount(&mock_server)
            .await;

        let result = provider_for(&mock_server)
            .fetch_credential("channel-x", None)
            .await;

        assert!(matches!(result, Err(CredentialError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_fetch_non_json_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let result = provider_for(&mock_server)
            .fetch_credential("channel-x", None)
            .await;

        assert!(matches!(result, Err(CredentialError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_fetch_network_error() {
        // Port 1 on loopback refuses connections
        let provider = CredentialProvider::new(
            CredentialProviderConfig::new("http://127.0.0.1:1".to_string())
                .with_http_timeout(Duration::from_secs(2)),
        )
        .unwrap();

        let result = provider.fetch_credential("channel-x", None).await;

        assert!(matches!(result, Err(CredentialError::HttpError(_))));
    }

    // =========================================================================
    // Background Fetch Tests
    // =========================================================================

    #[tokio::test]
    async fn test_spawn_fetch_publishes_credential() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "abc"
            })))
            .mount(&mock_server)
            .await;

        let (task, mut receiver) =
            spawn_credential_fetch(provider_for(&mock_server), "channel-x".to_string(), None);

        if receiver.is_pending() {
            receiver.changed().await.unwrap();
        }
        task.await.unwrap();

        let credential = receiver.current().expect("credential should be ready");
        assert_eq!(credential.token().expose_secret(), "abc");
        assert!(!receiver.is_pending());
    }

    #[tokio::test]
    async fn test_spawn_fetch_failure_is_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/access_token"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let (task, receiver) =
            spawn_credential_fetch(provider_for(&mock_server), "channel-x".to_string(), None);

        task.await.unwrap();

        assert!(receiver.current().is_none());
        assert!(matches!(receiver.state(), CredentialState::Unavailable));
    }

    #[test]
    fn test_receiver_debug_hides_token() {
        let credential = Credential::new(SecretString::from("hidden"), "c".to_string(), None);
        let (_tx, rx) = watch::channel(CredentialState::Ready(credential));
        let receiver = CredentialReceiver::from_watch_receiver(rx);

        let debug_str = format!("{receiver:?}");
        assert!(debug_str.contains("ready"));
        assert!(!debug_str.contains("hidden"));
    }
}
