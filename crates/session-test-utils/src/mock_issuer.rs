//! Mock credential issuer.
//!
//! Serves `GET /access_token?channel=<name>[&uid=<id>]` and can be configured
//! to:
//! - Return a token, optionally only for a specific uid
//! - Fail with an HTTP status
//! - Answer slowly
//! - Return a malformed body
//!
//! # Example
//!
//! ```rust,ignore
//! use session_test_utils::MockIssuer;
//!
//! let issuer = MockIssuer::builder().failing_with(500).start().await;
//! assert_eq!(issuer.request_count().await, 0);
//! ```

use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Channel used when none is configured.
pub const DEFAULT_TEST_CHANNEL: &str = "channel-x";

/// Token used when none is configured.
pub const DEFAULT_TEST_TOKEN: &str = "abc";

#[derive(Debug, Clone)]
enum Reply {
    Token(String),
    Status(u16),
    Body(String),
}

/// Running mock issuer.
pub struct MockIssuer {
    server: MockServer,
}

impl MockIssuer {
    /// Create a new `MockIssuer` builder.
    #[must_use]
    pub fn builder() -> MockIssuerBuilder {
        MockIssuerBuilder::default()
    }

    /// An issuer answering `{"token": "abc"}` for `channel-x`.
    pub async fn issuing() -> Self {
        Self::builder().start().await
    }

    /// An issuer failing every request with `status`.
    pub async fn failing(status: u16) -> Self {
        Self::builder().failing_with(status).start().await
    }

    /// Base URL to configure as the issuer.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Number of requests received so far.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }

    /// `uid` query values of the received requests, in order.
    pub async fn requested_uids(&self) -> Vec<Option<String>> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| {
                request
                    .url
                    .query_pairs()
                    .find(|(key, _)| key == "uid")
                    .map(|(_, value)| value.into_owned())
            })
            .collect()
    }
}

/// Builder for `MockIssuer` configuration.
#[derive(Debug)]
pub struct MockIssuerBuilder {
    channel: String,
    uid: Option<u64>,
    reply: Reply,
    delay: Option<Duration>,
}

impl Default for MockIssuerBuilder {
    fn default() -> Self {
        Self {
            channel: DEFAULT_TEST_CHANNEL.to_string(),
            uid: None,
            reply: Reply::Token(DEFAULT_TEST_TOKEN.to_string()),
            delay: None,
        }
    }
}

impl MockIssuerBuilder {
    /// Only answer requests for `channel`.
    #[must_use]
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Only answer requests carrying `uid`.
    #[must_use]
    pub fn uid(mut self, uid: u64) -> Self {
        self.uid = Some(uid);
        self
    }

    /// Answer with `{"token": <token>}`.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.reply = Reply::Token(token.into());
        self
    }

    /// Answer with an HTTP error status.
    #[must_use]
    pub fn failing_with(mut self, status: u16) -> Self {
        self.reply = Reply::Status(status);
        self
    }

    /// Answer 200 with a raw body.
    #[must_use]
    pub fn raw_body(mut self, body: impl Into<String>) -> Self {
        self.reply = Reply::Body(body.into());
        self
    }

    /// Delay every answer.
    #[must_use]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Start the server and mount the configured response.
    pub async fn start(self) -> MockIssuer {
        let server = MockServer::start().await;

        let mut response = match self.reply {
            Reply::Token(token) => {
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": token }))
            }
            Reply::Status(status) => {
                ResponseTemplate::new(status).set_body_string("issuer unavailable")
            }
            Reply::Body(body) => ResponseTemplate::new(200).set_body_string(body),
        };
        if let Some(delay) = self.delay {
            response = response.set_delay(delay);
        }

        let mut mock = Mock::given(method("GET"))
            .and(path("/access_token"))
            .and(query_param("channel", self.channel.as_str()));
        if let Some(uid) = self.uid {
            mock = mock.and(query_param("uid", uid.to_string()));
        }
        mock.respond_with(response).mount(&server).await;

        MockIssuer { server }
    }
}
