//! # Session Test Utilities
//!
//! Mocks and fixtures for testing the call session without a real credential
//! issuer or engine.
//!
//! - `mock_issuer` - wiremock-backed credential issuer
//! - `fixtures` - configuration variables and preloaded credentials
//!
//! The scriptable engine lives in `rtc_engine::testing` behind the
//! `test-utils` feature.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use session_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let issuer = MockIssuer::builder()
//!         .channel("channel-x")
//!         .token("abc")
//!         .start()
//!         .await;
//!
//!     let vars = TestCallVars::new(&issuer.url()).build();
//!     // Config::from_vars(&vars) ...
//! }
//! ```

pub mod fixtures;
pub mod mock_issuer;

pub use fixtures::*;
pub use mock_issuer::*;
