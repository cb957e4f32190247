//! Scriptable in-memory engine for tests.
//!
//! [`MockEngineFactory`] produces [`MockEngine`]s that record every call and
//! share their state with a [`MockEngineController`]. Tests use the
//! controller to inspect calls, inject callbacks and script failures.
//!
//! ```rust,ignore
//! use rtc_engine::testing::MockEngineFactory;
//!
//! let (factory, engine) = MockEngineFactory::new();
//! // hand `factory` to the session under test, then:
//! engine.emit_user_joined(77);
//! assert_eq!(engine.join_calls().len(), 1);
//! ```

use crate::config::{ChannelProfile, ClientRole, VideoEncoderConfig};
use crate::engine::{RtcEngine, RtcEngineFactory};
use crate::error::EngineError;
use crate::events::{EngineEvent, EngineEventSender, ErrorCode, OfflineReason, WarningCode};
use common::secret::{ExposeSecret, SecretString};
use common::types::ParticipantId;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Id the mock assigns when joined with [`ParticipantId::UNASSIGNED`].
pub const MOCK_ASSIGNED_ID: ParticipantId = ParticipantId(9_000);

/// A recorded engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    /// Factory `create`.
    Create {
        /// App identity passed to the factory.
        app_identity: String,
    },
    /// `configure_video`.
    ConfigureVideo(VideoEncoderConfig),
    /// `enable_video`.
    EnableVideo,
    /// `set_channel_profile`.
    SetChannelProfile(ChannelProfile),
    /// `set_client_role`.
    SetClientRole(ClientRole),
    /// `join_channel`, with the token exposed for assertions.
    JoinChannel {
        /// Token value.
        token: String,
        /// Channel name.
        channel: String,
        /// Optional info string.
        info: Option<String>,
        /// Requested local id.
        local_id: ParticipantId,
    },
    /// `leave_channel`.
    LeaveChannel,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<EngineCall>,
    events: Option<EngineEventSender>,
    fail_create: bool,
    join_failure: Option<i32>,
    leave_failure: Option<i32>,
    auto_join_success: bool,
    join_delay: Option<Duration>,
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Factory producing [`MockEngine`]s.
#[derive(Debug, Clone)]
pub struct MockEngineFactory {
    state: Shared,
}

impl MockEngineFactory {
    /// Create a factory and the controller observing its engines.
    #[must_use]
    pub fn new() -> (Self, MockEngineController) {
        let state = Shared::default();
        (
            Self {
                state: Arc::clone(&state),
            },
            MockEngineController { state },
        )
    }
}

#[async_trait::async_trait]
impl RtcEngineFactory for MockEngineFactory {
    type Engine = MockEngine;

    async fn create(
        &self,
        app_identity: &str,
        events: EngineEventSender,
    ) -> Result<MockEngine, EngineError> {
        let mut state = lock(&self.state);
        state.calls.push(EngineCall::Create {
            app_identity: app_identity.to_string(),
        });
        if state.fail_create {
            return Err(EngineError::CreationFailed(
                "mock engine configured to fail".to_string(),
            ));
        }
        state.events = Some(events);
        Ok(MockEngine {
            state: Arc::clone(&self.state),
        })
    }
}

/// In-memory engine recording its calls.
#[derive(Debug)]
pub struct MockEngine {
    state: Shared,
}

impl MockEngine {
    fn record(&self, call: EngineCall) {
        lock(&self.state).calls.push(call);
    }
}

#[async_trait::async_trait]
impl RtcEngine for MockEngine {
    async fn configure_video(&self, config: VideoEncoderConfig) -> Result<(), EngineError> {
        self.record(EngineCall::ConfigureVideo(config));
        Ok(())
    }

    async fn enable_video(&self) -> Result<(), EngineError> {
        self.record(EngineCall::EnableVideo);
        Ok(())
    }

    async fn set_channel_profile(&self, profile: ChannelProfile) -> Result<(), EngineError> {
        self.record(EngineCall::SetChannelProfile(profile));
        Ok(())
    }

    async fn set_client_role(&self, role: ClientRole) -> Result<(), EngineError> {
        self.record(EngineCall::SetClientRole(role));
        Ok(())
    }

    async fn join_channel(
        &self,
        token: &SecretString,
        channel: &str,
        info: Option<&str>,
        local_id: ParticipantId,
    ) -> Result<(), EngineError> {
        let delay = {
            let mut state = lock(&self.state);
            state.calls.push(EngineCall::JoinChannel {
                token: token.expose_secret().to_string(),
                channel: channel.to_string(),
                info: info.map(str::to_string),
                local_id,
            });
            state.join_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = lock(&self.state);
        if let Some(code) = state.join_failure {
            return Err(EngineError::OperationFailed {
                operation: "join_channel",
                code,
            });
        }
        if state.auto_join_success {
            if let Some(events) = &state.events {
                let id = if local_id.is_unassigned() {
                    MOCK_ASSIGNED_ID
                } else {
                    local_id
                };
                events.emit(EngineEvent::JoinChannelSuccess {
                    channel: channel.to_string(),
                    id,
                    elapsed: Duration::from_millis(5),
                });
            }
        }
        Ok(())
    }

    async fn leave_channel(&self) -> Result<(), EngineError> {
        let mut state = lock(&self.state);
        state.calls.push(EngineCall::LeaveChannel);
        match state.leave_failure {
            Some(code) => Err(EngineError::OperationFailed {
                operation: "leave_channel",
                code,
            }),
            None => Ok(()),
        }
    }
}

/// Test-side view of the mock engine.
#[derive(Debug, Clone)]
pub struct MockEngineController {
    state: Shared,
}

impl MockEngineController {
    /// Make the next `create` fail.
    pub fn fail_create(&self) {
        lock(&self.state).fail_create = true;
    }

    /// Make `join_channel` fail with `code`.
    pub fn fail_join(&self, code: i32) {
        lock(&self.state).join_failure = Some(code);
    }

    /// Make `leave_channel` fail with `code`.
    pub fn fail_leave(&self, code: i32) {
        lock(&self.state).leave_failure = Some(code);
    }

    /// Emit `JoinChannelSuccess` automatically when `join_channel` is accepted.
    pub fn auto_join_success(&self) {
        lock(&self.state).auto_join_success = true;
    }

    /// Hold every `join_channel` call for `delay` before answering.
    pub fn delay_join(&self, delay: Duration) {
        lock(&self.state).join_delay = Some(delay);
    }

    /// All recorded calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.state).calls.clone()
    }

    /// Recorded `join_channel` calls.
    #[must_use]
    pub fn join_calls(&self) -> Vec<EngineCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, EngineCall::JoinChannel { .. }))
            .collect()
    }

    /// Number of `leave_channel` calls.
    #[must_use]
    pub fn leave_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::LeaveChannel))
            .count()
    }

    /// Number of factory `create` calls.
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::Create { .. }))
            .count()
    }

    /// Whether an engine has been created and its event channel is open.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        lock(&self.state)
            .events
            .as_ref()
            .is_some_and(|events| !events.is_closed())
    }

    /// Deliver an arbitrary event. Returns `false` if nothing is listening.
    pub fn emit(&self, event: EngineEvent) -> bool {
        lock(&self.state)
            .events
            .as_ref()
            .is_some_and(|events| events.emit(event))
    }

    /// Deliver `JoinChannelSuccess`.
    pub fn emit_join_success(&self, channel: &str, id: u64) -> bool {
        self.emit(EngineEvent::JoinChannelSuccess {
            channel: channel.to_string(),
            id: ParticipantId(id),
            elapsed: Duration::ZERO,
        })
    }

    /// Deliver `UserJoined`.
    pub fn emit_user_joined(&self, id: u64, elapsed_ms: u64) -> bool {
        self.emit(EngineEvent::UserJoined {
            id: ParticipantId(id),
            elapsed: Duration::from_millis(elapsed_ms),
        })
    }

    /// Deliver `UserOffline`.
    pub fn emit_user_offline(&self, id: u64, reason: i32) -> bool {
        self.emit(EngineEvent::UserOffline {
            id: ParticipantId(id),
            reason: OfflineReason::from(reason),
        })
    }

    /// Deliver `Warning`.
    pub fn emit_warning(&self, code: i32) -> bool {
        self.emit(EngineEvent::Warning {
            code: WarningCode(code),
        })
    }

    /// Deliver `Error`.
    pub fn emit_error(&self, code: i32) -> bool {
        self.emit(EngineEvent::Error {
            code: ErrorCode(code),
        })
    }
}
