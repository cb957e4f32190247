//! Call session configuration.
//!
//! Configuration is loaded from environment variables. The app identity is
//! redacted in Debug output.

use crate::permissions::Platform;
use crate::role::RolePolicy;
use common::identity::{DEFAULT_ID_DIGITS, MAX_ID_DIGITS};
use common::secret::{ExposeSecret, SecretString};
use common::types::ChannelDescriptor;
use rtc_engine::FrameRate;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default credential request timeout in seconds.
pub const DEFAULT_CREDENTIAL_HTTP_TIMEOUT_SECONDS: u64 = 10;

/// Default video frame rate.
pub const DEFAULT_VIDEO_FRAME_RATE: u32 = 30;

/// Call session configuration.
#[derive(Clone)]
pub struct Config {
    /// Engine app identity. Protected by `SecretString` to keep it out of logs.
    pub app_id: SecretString,

    /// Channel to join.
    pub channel_name: String,

    /// Base URL of the credential issuer.
    pub credential_issuer_url: String,

    /// Publisher, viewer or viewer with local preview (default: publisher).
    pub role_policy: RolePolicy,

    /// Request a credential bound to a locally allocated participant id
    /// (default: true). When false the join uses the unassigned sentinel.
    pub personalized_credential: bool,

    /// Digit length of allocated participant ids (default: 10).
    pub uid_digits: u32,

    /// Credential request timeout (default: 10s).
    pub credential_http_timeout: Duration,

    /// Encoder frame rate (default: 30 fps).
    pub video_frame_rate: FrameRate,

    /// Target platform (default: desktop).
    pub platform: Platform,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("app_id", &"[REDACTED]")
            .field("channel_name", &self.channel_name)
            .field("credential_issuer_url", &self.credential_issuer_url)
            .field("role_policy", &self.role_policy)
            .field("personalized_credential", &self.personalized_credential)
            .field("uid_digits", &self.uid_digits)
            .field("credential_http_timeout", &self.credential_http_timeout)
            .field("video_frame_rate", &self.video_frame_rate)
            .field("platform", &self.platform)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    match vars.get(name).map(|v| v.trim()) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}

fn parsed<T>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match vars.get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("{name}: {e}"))),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a variable map.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let app_id = SecretString::from(required(vars, "CALL_APP_ID")?);
        let channel_name = required(vars, "CALL_CHANNEL_NAME")?;

        let credential_issuer_url = required(vars, "CALL_CREDENTIAL_ISSUER_URL")?;
        if !credential_issuer_url.starts_with("http://")
            && !credential_issuer_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue(format!(
                "CALL_CREDENTIAL_ISSUER_URL must be an http(s) URL, got '{credential_issuer_url}'"
            )));
        }

        let role_policy = parsed(vars, "CALL_ROLE_POLICY", RolePolicy::default())?;
        let personalized_credential = parsed(vars, "CALL_PERSONALIZED_CREDENTIAL", true)?;

        let uid_digits = parsed(vars, "CALL_UID_DIGITS", DEFAULT_ID_DIGITS)?;
        if !(1..=MAX_ID_DIGITS).contains(&uid_digits) {
            return Err(ConfigError::InvalidValue(format!(
                "CALL_UID_DIGITS must be between 1 and {MAX_ID_DIGITS}, got {uid_digits}"
            )));
        }

        let timeout_seconds = parsed(
            vars,
            "CALL_CREDENTIAL_HTTP_TIMEOUT_SECONDS",
            DEFAULT_CREDENTIAL_HTTP_TIMEOUT_SECONDS,
        )?;
        if timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "CALL_CREDENTIAL_HTTP_TIMEOUT_SECONDS must be positive".to_string(),
            ));
        }

        let fps: u32 = parsed(vars, "CALL_VIDEO_FRAME_RATE", DEFAULT_VIDEO_FRAME_RATE)?;
        let video_frame_rate = FrameRate::try_from(fps)
            .map_err(|e| ConfigError::InvalidValue(format!("CALL_VIDEO_FRAME_RATE: {e}")))?;

        let platform = parsed(vars, "CALL_PLATFORM", Platform::default())?;

        Ok(Config {
            app_id,
            channel_name,
            credential_issuer_url,
            role_policy,
            personalized_credential,
            uid_digits,
            credential_http_timeout: Duration::from_secs(timeout_seconds),
            video_frame_rate,
            platform,
        })
    }

    /// Channel and app identity for the session.
    #[must_use]
    pub fn channel_descriptor(&self) -> ChannelDescriptor {
        ChannelDescriptor::new(self.channel_name.clone(), self.app_id.expose_secret())
    }
}
