//! Call session controller.
//!
//! Drives a real-time call on top of an [`rtc_engine::RtcEngine`]:
//!
//! - Credential-gated join: `start_call` is refused until the background
//!   credential fetch succeeds
//! - Roster of remote participants folded from engine callbacks
//! - Role policy deciding publisher or viewer before the join
//!
//! # Architecture
//!
//! ```text
//! CallClient::start
//!   ├── permissions prompt (mobile)
//!   ├── IdentityAllocator (personalized variant)
//!   ├── spawn_credential_fetch ──watch──┐
//!   └── CallSessionActor <──────────────┘
//!         ├── commands   (CallSessionHandle)
//!         └── callbacks  (EngineEventSender)
//! ```
//!
//! All state lives in the actor; the presentation layer reads
//! [`SessionSnapshot`]s.


pub mod actors;
pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod observability;
pub mod permissions;
pub mod role;
pub mod roster;

pub use actors::{CallSessionActor, CallSessionHandle, SessionSnapshot, SessionStatus};
pub use bootstrap::CallClient;
pub use config::{Config, ConfigError};
pub use errors::SessionError;
pub use role::{RenderSurface, Role, RoleAssignment, RolePolicy};
pub use roster::Roster;
