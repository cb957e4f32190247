//! Real-time communication engine contract.
//!
//! The call session drives an external audio/video engine but never
//! implements one. This crate pins down the part of the engine it relies on:
//!
//! - [`RtcEngineFactory`] creates an engine for an app identity and hands it
//!   an [`EngineEventSender`] for asynchronous callbacks
//! - [`RtcEngine`] exposes configuration, join and leave
//! - [`EngineEvent`] is the typed form of the engine's callbacks
//!
//! Media encoding, transport and rendering stay inside the engine.

#![warn(clippy::pedantic)]

pub mod config;
pub mod engine;
pub mod error;
pub mod events;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::{ChannelProfile, ClientRole, FrameRate, VideoEncoderConfig};
pub use engine::{RtcEngine, RtcEngineFactory};
pub use error::EngineError;
pub use events::{EngineEvent, EngineEventSender, ErrorCode, OfflineReason, WarningCode};
