//! Actor owning the call session state.
//!
//! - `CallSessionActor`: folds commands, engine callbacks and credential
//!   updates into one consistent state
//! - `CallSessionHandle`: cloneable front end used by the presentation layer

pub mod messages;
pub mod session;

pub use messages::{SessionSnapshot, SessionStatus};
pub use session::{CallSessionActor, CallSessionHandle};
