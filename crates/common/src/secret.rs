//! Secret types for keeping join credentials out of logs.
//!
//! Re-exports [`secrecy`] types. Join tokens handed out by the credential
//! issuer grant access to a live channel, so they are held as
//! [`SecretString`] from the moment they are parsed until the engine's join
//! call reads them with [`ExposeSecret::expose_secret`].
//!
//! `SecretString` redacts itself in `Debug`, so any struct deriving `Debug`
//! that holds one is safe to pass to `tracing` with `?value`.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct JoinArgs {
//!     channel: String,
//!     token: SecretString,
//! }
//!
//! let args = JoinArgs {
//!     channel: "channel-x".to_string(),
//!     token: SecretString::from("006abc"),
//! };
//!
//! assert!(!format!("{args:?}").contains("006abc"));
//! assert_eq!(args.token.expose_secret(), "006abc");
//! ```

pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("006join-token");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("006join-token"));
    }

    #[test]
    fn test_issuer_body_deserializes_into_secret() {
        #[derive(Debug, Deserialize)]
        struct Body {
            token: SecretString,
        }

        let body: Body = serde_json::from_str(r#"{"token": "abc"}"#).expect("deserialize");

        assert_eq!(body.token.expose_secret(), "abc");
        assert!(!format!("{body:?}").contains("abc"));
    }
}
