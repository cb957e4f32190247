//! `CallSessionActor` - single owner of the call session state.
//!
//! Commands from the handle, engine callbacks and credential updates are all
//! folded into state by one task, one at a time. Roster updates therefore
//! cannot race, and a second `start_call` always observes the first one's
//! status.
//!
//! # Event ordering
//!
//! The select loop is biased: cancellation first, then engine events, then
//! credential updates, then commands. An event emitted before a command was
//! sent is applied before that command is handled.

use super::messages::{SessionMessage, SessionSnapshot, SessionStatus};
use crate::errors::SessionError;
use crate::observability::metrics;
use crate::roster::Roster;
use crate::role::{RoleAssignment, RolePolicy};

use common::credential::{CredentialError, CredentialReceiver, CredentialState};
use common::types::{ChannelDescriptor, ParticipantId};
use rtc_engine::{
    ChannelProfile, EngineError, EngineEvent, EngineEventSender, RtcEngine, RtcEngineFactory,
    VideoEncoderConfig,
};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Default channel buffer size for the session mailbox.
const SESSION_CHANNEL_BUFFER: usize = 32;

/// Handle to a `CallSessionActor`.
#[derive(Clone)]
pub struct CallSessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    cancel_token: CancellationToken,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl CallSessionHandle {
    /// Create the engine, configure it and apply the role policy.
    ///
    /// Runs at most once; a second call fails with
    /// `SessionError::InvalidTransition`.
    pub async fn initialize(
        &self,
        role_policy: RolePolicy,
        video: VideoEncoderConfig,
    ) -> Result<RoleAssignment, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::Initialize {
                role_policy,
                video,
                respond_to: tx,
            })
            .await
            .map_err(|e| SessionError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))?
    }

    /// Join the channel.
    ///
    /// Never waits for the credential: if it is not available yet the call
    /// is refused with `SessionError::CredentialUnavailable` and nothing
    /// changes. Returns the id of the call attempt. The session becomes
    /// active only when the engine reports join success.
    pub async fn start_call(&self) -> Result<Uuid, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::StartCall { respond_to: tx })
            .await
            .map_err(|e| SessionError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))?
    }

    /// Leave the channel.
    ///
    /// Leave is best-effort: once accepted, the session ends idle with an
    /// empty roster even if the engine reports a failure.
    pub async fn end_call(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::EndCall { respond_to: tx })
            .await
            .map_err(|e| SessionError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))?
    }

    /// Current state, after every event queued before this call.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::GetSnapshot { respond_to: tx })
            .await
            .map_err(|e| SessionError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))
    }

    /// Subscribe to snapshots pushed after every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Cancel the actor. An active call is ended first.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// The `CallSessionActor` implementation.
pub struct CallSessionActor<F: RtcEngineFactory> {
    /// Channel and app identity.
    descriptor: ChannelDescriptor,
    /// Engine factory, used once by `initialize`.
    factory: F,
    /// Engine, present once `initialize` succeeded.
    engine: Option<F::Engine>,
    /// Engine callbacks, present once `initialize` succeeded.
    events: Option<mpsc::UnboundedReceiver<EngineEvent>>,
    /// Background credential fetch.
    credential: CredentialReceiver,
    /// Whether the credential fetch may still change.
    watching_credential: bool,
    /// Locally allocated id, `None` in the shared-credential variant.
    local_id: Option<ParticipantId>,
    /// Id reported by the engine on join success.
    joined_id: Option<ParticipantId>,
    status: SessionStatus,
    roster: Roster,
    role: Option<RoleAssignment>,
    /// Current call attempt.
    call_id: Option<Uuid>,
    /// When the current join was requested.
    join_started: Option<Instant>,
    /// When the actor was spawned.
    spawned_at: Instant,
    /// Command receiver.
    receiver: mpsc::Receiver<SessionMessage>,
    /// Cancellation token.
    cancel_token: CancellationToken,
    /// Snapshot publisher.
    snapshots: watch::Sender<SessionSnapshot>,
}

impl<F: RtcEngineFactory> CallSessionActor<F> {
    /// Spawn a new session actor.
    ///
    /// Returns a handle and the task join handle.
    ///
    /// # Arguments
    ///
    /// * `descriptor` - Channel and app identity
    /// * `factory` - Creates the engine during `initialize`
    /// * `credential` - Receiver of the background credential fetch
    /// * `local_id` - Allocated local id, or `None` to let the engine assign one
    /// * `cancel_token` - Cancellation token
    pub fn spawn(
        descriptor: ChannelDescriptor,
        factory: F,
        credential: CredentialReceiver,
        local_id: Option<ParticipantId>,
        cancel_token: CancellationToken,
    ) -> (CallSessionHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(SESSION_CHANNEL_BUFFER);

        let initial = SessionSnapshot {
            status: SessionStatus::Idle,
            is_active: false,
            roster: Vec::new(),
            role: None,
            local_participant_id: local_id,
            channel_name: descriptor.channel_name().to_string(),
            call_id: None,
        };
        let (snapshots, snapshot_rx) = watch::channel(initial);

        let watching_credential = credential.is_pending();
        let actor = Self {
            descriptor,
            factory,
            engine: None,
            events: None,
            credential,
            watching_credential,
            local_id,
            joined_id: None,
            status: SessionStatus::Idle,
            roster: Roster::new(),
            role: None,
            call_id: None,
            join_started: None,
            spawned_at: Instant::now(),
            receiver,
            cancel_token: cancel_token.clone(),
            snapshots,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = CallSessionHandle {
            sender,
            cancel_token,
            snapshots: snapshot_rx,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "session.actor", fields(channel = %self.descriptor.channel_name()))]
    async fn run(mut self) {
        info!(
            target: "session.actor",
            channel = %self.descriptor.channel_name(),
            personalized = self.local_id.is_some(),
            "CallSessionActor started"
        );

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "session.actor",
                        status = %self.status,
                        "CallSessionActor received cancellation signal"
                    );
                    if self.status.in_call() {
                        self.teardown().await;
                    }
                    break;
                }

                event = next_event(&mut self.events) => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            warn!(
                                target: "session.actor",
                                "Engine event channel closed, no further callbacks"
                            );
                            self.events = None;
                        }
                    }
                }

                result = credential_change(&mut self.credential, self.watching_credential) => {
                    self.handle_credential_change(result);
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            info!(
                                target: "session.actor",
                                "CallSessionActor channel closed, exiting"
                            );
                            if self.status.in_call() {
                                self.teardown().await;
                            }
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "session.actor",
            status = %self.status,
            roster = self.roster.len(),
            "CallSessionActor stopped"
        );
    }

    /// Handle a single command.
    async fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Initialize {
                role_policy,
                video,
                respond_to,
            } => {
                let result = self.handle_initialize(role_policy, video).await;
                let _ = respond_to.send(result);
            }

            SessionMessage::StartCall { respond_to } => {
                let result = self.handle_start_call().await;
                let _ = respond_to.send(result);
            }

            SessionMessage::EndCall { respond_to } => {
                let result = self.handle_end_call().await;
                let _ = respond_to.send(result);
            }

            SessionMessage::GetSnapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
        }
    }

    #[instrument(skip_all, fields(role_policy = %role_policy))]
    async fn handle_initialize(
        &mut self,
        role_policy: RolePolicy,
        video: VideoEncoderConfig,
    ) -> Result<RoleAssignment, SessionError> {
        if self.engine.is_some() {
            warn!(
                target: "session.actor",
                status = %self.status,
                "Initialize refused, engine already initialized"
            );
            return Err(SessionError::InvalidTransition {
                operation: "initialize",
                status: self.status,
            });
        }

        self.set_status(SessionStatus::Initializing);

        let assignment = role_policy.assign(self.local_id.is_some());
        let (event_sender, event_receiver) = EngineEventSender::channel();

        let engine = match self
            .factory
            .create(self.descriptor.app_identity(), event_sender)
            .await
        {
            Ok(engine) => engine,
            Err(e) => {
                error!(
                    target: "session.actor",
                    error = %e,
                    "Engine creation failed"
                );
                self.set_status(SessionStatus::Idle);
                return Err(e.into());
            }
        };

        if let Err(e) = configure(&engine, video, assignment).await {
            error!(
                target: "session.actor",
                error = %e,
                "Engine configuration failed"
            );
            self.set_status(SessionStatus::Idle);
            return Err(e.into());
        }

        self.engine = Some(engine);
        self.events = Some(event_receiver);
        self.role = Some(assignment);

        info!(
            target: "session.actor",
            role = ?assignment.role(),
            renders_local = assignment.renders_local(),
            fps = video.frame_rate.fps(),
            "Engine initialized"
        );

        if self.credential.is_pending() {
            self.set_status(SessionStatus::AwaitingCredential);
        } else {
            self.set_status(SessionStatus::Idle);
        }

        Ok(assignment)
    }

    #[instrument(skip_all)]
    async fn handle_start_call(&mut self) -> Result<Uuid, SessionError> {
        if self.engine.is_none() {
            warn!(target: "session.actor", "Start call refused, engine not initialized");
            metrics::record_join_attempt("refused", "not_initialized");
            return Err(SessionError::NotInitialized);
        }

        if matches!(
            self.status,
            SessionStatus::Joining | SessionStatus::Joined | SessionStatus::Leaving
        ) {
            debug!(
                target: "session.actor",
                status = %self.status,
                "Start call ignored, call already in progress"
            );
            metrics::record_join_attempt("refused", "in_progress");
            return Err(SessionError::InvalidTransition {
                operation: "start_call",
                status: self.status,
            });
        }

        let credential = match self.credential.state() {
            CredentialState::Ready(credential) => credential,
            CredentialState::Pending => {
                warn!(
                    target: "session.actor",
                    "Start call refused, credential fetch still pending"
                );
                metrics::record_join_attempt("refused", "credential_pending");
                return Err(SessionError::CredentialUnavailable(
                    "credential fetch still pending".to_string(),
                ));
            }
            CredentialState::Unavailable => {
                warn!(
                    target: "session.actor",
                    "Start call refused, credential fetch failed"
                );
                metrics::record_join_attempt("refused", "credential_failed");
                return Err(SessionError::CredentialUnavailable(
                    "credential fetch failed".to_string(),
                ));
            }
        };

        if credential.channel() != self.descriptor.channel_name() {
            warn!(
                target: "session.actor",
                credential_channel = %credential.channel(),
                "Credential was issued for a different channel"
            );
        }

        let call_id = Uuid::new_v4();
        let join_id = self.local_id.unwrap_or(ParticipantId::UNASSIGNED);

        self.roster.clear();
        metrics::set_roster_size(0);
        self.joined_id = None;
        self.call_id = Some(call_id);
        self.join_started = Some(Instant::now());
        self.set_status(SessionStatus::Joining);

        info!(
            target: "session.actor",
            call_id = %call_id,
            local_id = %join_id,
            "Joining channel"
        );

        let result = match self.engine.as_ref() {
            Some(engine) => {
                engine
                    .join_channel(
                        credential.token(),
                        self.descriptor.channel_name(),
                        None,
                        join_id,
                    )
                    .await
            }
            None => return Err(SessionError::NotInitialized),
        };

        match result {
            Ok(()) => {
                metrics::record_join_attempt("accepted", "none");
                Ok(call_id)
            }
            Err(e) => {
                error!(
                    target: "session.actor",
                    call_id = %call_id,
                    error = %e,
                    "Join rejected by engine"
                );
                metrics::record_join_attempt("error", "engine");
                self.call_id = None;
                self.join_started = None;
                self.set_status(SessionStatus::Idle);
                Err(e.into())
            }
        }
    }

    #[instrument(skip_all)]
    async fn handle_end_call(&mut self) -> Result<(), SessionError> {
        if self.engine.is_none() {
            debug!(target: "session.actor", "End call ignored, engine not initialized");
            return Err(SessionError::NotInitialized);
        }

        if !self.status.in_call() {
            debug!(
                target: "session.actor",
                status = %self.status,
                "End call ignored, no call in progress"
            );
            return Err(SessionError::InvalidTransition {
                operation: "end_call",
                status: self.status,
            });
        }

        self.teardown().await;
        Ok(())
    }

    /// Leave (best-effort), clear the roster and return to idle.
    async fn teardown(&mut self) {
        let call_id = self.call_id;
        self.set_status(SessionStatus::Leaving);

        let result = match self.engine.as_ref() {
            Some(engine) => engine.leave_channel().await,
            None => Ok(()),
        };

        match result {
            Ok(()) => metrics::record_leave("success"),
            Err(e) => {
                warn!(
                    target: "session.actor",
                    call_id = ?call_id,
                    error = %e,
                    "Leave failed, resetting session anyway"
                );
                metrics::record_leave("error");
            }
        }

        self.roster.clear();
        metrics::set_roster_size(0);
        self.call_id = None;
        self.join_started = None;
        self.set_status(SessionStatus::Idle);

        info!(target: "session.actor", call_id = ?call_id, "Call ended");
    }

    /// Fold an engine callback into state.
    fn handle_event(&mut self, event: EngineEvent) {
        metrics::record_engine_event(event.kind());

        match event {
            EngineEvent::Warning { code } => {
                warn!(target: "session.actor", code = %code, "Engine warning");
            }

            EngineEvent::Error { code } => {
                error!(target: "session.actor", code = %code, "Engine error");
            }

            EngineEvent::UserJoined { id, elapsed } => {
                if !self.status.in_call() {
                    debug!(
                        target: "session.actor",
                        participant = %id,
                        status = %self.status,
                        "Ignoring remote join outside a call"
                    );
                    return;
                }
                if Some(id) == self.joined_id {
                    debug!(target: "session.actor", participant = %id, "Ignoring join of local id");
                    return;
                }
                if self.roster.add(id) {
                    debug!(
                        target: "session.actor",
                        participant = %id,
                        elapsed_ms = elapsed_ms(elapsed),
                        "Remote participant joined"
                    );
                    self.roster_changed();
                }
            }

            EngineEvent::UserOffline { id, reason } => {
                if self.roster.remove(id) {
                    debug!(
                        target: "session.actor",
                        participant = %id,
                        ?reason,
                        "Remote participant left"
                    );
                    self.roster_changed();
                }
            }

            EngineEvent::JoinChannelSuccess {
                channel,
                id,
                elapsed,
            } => self.handle_join_success(&channel, id, elapsed),
        }
    }

    fn handle_join_success(&mut self, channel: &str, id: ParticipantId, elapsed: Duration) {
        if self.status != SessionStatus::Joining {
            debug!(
                target: "session.actor",
                status = %self.status,
                "Ignoring stale join success"
            );
            return;
        }

        if channel != self.descriptor.channel_name() {
            warn!(
                target: "session.actor",
                reported_channel = %channel,
                "Join success reported for an unexpected channel"
            );
        }

        if self.local_id.is_some_and(|local| local != id) {
            info!(
                target: "session.actor",
                requested = ?self.local_id,
                assigned = %id,
                "Engine assigned a different local id"
            );
        }
        self.joined_id = Some(id);
        if self.roster.remove(id) {
            metrics::set_roster_size(self.roster.len());
        }

        if let Some(started) = self.join_started.take() {
            metrics::record_join_latency(started.elapsed());
        }

        info!(
            target: "session.actor",
            call_id = ?self.call_id,
            local_id = %id,
            elapsed_ms = elapsed_ms(elapsed),
            "Joined channel"
        );
        self.set_status(SessionStatus::Joined);
    }

    fn handle_credential_change(&mut self, result: Result<(), CredentialError>) {
        if result.is_err() {
            self.watching_credential = false;
            return;
        }

        match self.credential.state() {
            CredentialState::Pending => return,
            CredentialState::Ready(_) => {
                metrics::record_credential_fetch("success", self.spawned_at.elapsed());
                info!(target: "session.actor", "Credential available");
            }
            CredentialState::Unavailable => {
                metrics::record_credential_fetch("error", self.spawned_at.elapsed());
                warn!(
                    target: "session.actor",
                    "Credential unavailable, calls will be refused"
                );
            }
        }

        self.watching_credential = false;
        if self.status == SessionStatus::AwaitingCredential {
            self.set_status(SessionStatus::Idle);
        }
    }

    fn roster_changed(&mut self) {
        metrics::set_roster_size(self.roster.len());
        self.publish();
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.status != status {
            debug!(
                target: "session.actor",
                from = %self.status,
                to = %status,
                "Session status changed"
            );
            metrics::record_status_transition(status.as_str());
            self.status = status;
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            is_active: self.status == SessionStatus::Joined,
            roster: self.roster.snapshot(),
            role: self.role,
            local_participant_id: self.joined_id.or(self.local_id),
            channel_name: self.descriptor.channel_name().to_string(),
            call_id: self.call_id,
        }
    }
}

/// Apply encoder, profile and role settings to a fresh engine.
async fn configure<E: RtcEngine>(
    engine: &E,
    video: VideoEncoderConfig,
    assignment: RoleAssignment,
) -> Result<(), EngineError> {
    engine.configure_video(video).await?;
    engine.enable_video().await?;
    engine
        .set_channel_profile(ChannelProfile::LiveBroadcasting)
        .await?;
    engine.set_client_role(assignment.client_role()).await?;
    Ok(())
}

/// Next engine event, or never when there is no engine yet.
async fn next_event(
    events: &mut Option<mpsc::UnboundedReceiver<EngineEvent>>,
) -> Option<EngineEvent> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}

/// Next credential update, or never once the fetch has settled.
async fn credential_change(
    credential: &mut CredentialReceiver,
    watching: bool,
) -> Result<(), CredentialError> {
    if watching {
        credential.changed().await
    } else {
        std::future::pending().await
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use rtc_engine::testing::{EngineCall, MockEngineController, MockEngineFactory, MOCK_ASSIGNED_ID};
    use rtc_engine::{ClientRole, FrameRate};
    use session_test_utils::{pending_credential, ready_credential, resolve_credential};

    const CHANNEL: &str = "channel-x";
    const LOCAL_ID: u64 = 4_821_337_019;

    fn descriptor() -> ChannelDescriptor {
        ChannelDescriptor::new(CHANNEL, "app-1")
    }

    fn spawn_with(
        credential: CredentialReceiver,
        local_id: Option<ParticipantId>,
    ) -> (CallSessionHandle, MockEngineController) {
        let (factory, controller) = MockEngineFactory::new();
        let (handle, _task) = CallSessionActor::spawn(
            descriptor(),
            factory,
            credential,
            local_id,
            CancellationToken::new(),
        );
        (handle, controller)
    }

    async fn ready_session() -> (CallSessionHandle, MockEngineController) {
        let (handle, controller) = spawn_with(
            ready_credential("abc", CHANNEL, Some(LOCAL_ID)),
            Some(ParticipantId(LOCAL_ID)),
        );
        handle
            .initialize(RolePolicy::Publisher, VideoEncoderConfig::default())
            .await
            .unwrap();
        (handle, controller)
    }

    #[tokio::test]
    async fn test_initialize_configures_engine() {
        let (handle, controller) = spawn_with(
            ready_credential("abc", CHANNEL, Some(LOCAL_ID)),
            Some(ParticipantId(LOCAL_ID)),
        );

        let video = VideoEncoderConfig {
            frame_rate: FrameRate::Fps15,
        };
        let role = handle.initialize(RolePolicy::Publisher, video).await.unwrap();
        assert!(role.is_host());

        assert_eq!(
            controller.calls(),
            vec![
                EngineCall::Create {
                    app_identity: "app-1".to_string()
                },
                EngineCall::ConfigureVideo(video),
                EngineCall::EnableVideo,
                EngineCall::SetChannelProfile(ChannelProfile::LiveBroadcasting),
                EngineCall::SetClientRole(ClientRole::Broadcaster),
            ]
        );

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Idle);
        assert_eq!(snapshot.role, Some(role));
        assert!(controller.is_subscribed());
    }

    #[tokio::test]
    async fn test_viewer_declares_audience() {
        let (handle, controller) = spawn_with(ready_credential("abc", CHANNEL, None), None);

        let role = handle
            .initialize(RolePolicy::Viewer, VideoEncoderConfig::default())
            .await
            .unwrap();

        assert!(role.is_viewer());
        assert!(controller
            .calls()
            .contains(&EngineCall::SetClientRole(ClientRole::Audience)));
    }

    #[tokio::test]
    async fn test_initialize_twice_is_rejected() {
        let (handle, controller) = ready_session().await;

        let second = handle
            .initialize(RolePolicy::Viewer, VideoEncoderConfig::default())
            .await;

        assert!(matches!(
            second,
            Err(SessionError::InvalidTransition {
                operation: "initialize",
                ..
            })
        ));
        assert_eq!(controller.create_count(), 1);
        assert!(handle.snapshot().await.unwrap().role.unwrap().is_host());
    }

    #[tokio::test]
    async fn test_engine_creation_failure_returns_to_idle() {
        let (factory, controller) = MockEngineFactory::new();
        controller.fail_create();
        let (handle, _task) = CallSessionActor::spawn(
            descriptor(),
            factory,
            ready_credential("abc", CHANNEL, None),
            None,
            CancellationToken::new(),
        );

        let result = handle
            .initialize(RolePolicy::Publisher, VideoEncoderConfig::default())
            .await;
        assert!(matches!(result, Err(SessionError::Engine(_))));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Idle);
        assert_eq!(snapshot.role, None);

        assert!(matches!(
            handle.start_call().await,
            Err(SessionError::NotInitialized)
        ));
        assert!(controller.join_calls().is_empty());
    }

    #[tokio::test]
    async fn test_pending_credential_awaits_then_settles() {
        let (sender, credential) = pending_credential();
        let (handle, controller) = spawn_with(credential, Some(ParticipantId(LOCAL_ID)));

        handle
            .initialize(RolePolicy::Publisher, VideoEncoderConfig::default())
            .await
            .unwrap();
        assert_eq!(
            handle.snapshot().await.unwrap().status,
            SessionStatus::AwaitingCredential
        );

        // Fails closed while the fetch is outstanding.
        let refused = handle.start_call().await;
        assert!(matches!(
            refused,
            Err(SessionError::CredentialUnavailable(_))
        ));
        assert_eq!(
            handle.snapshot().await.unwrap().status,
            SessionStatus::AwaitingCredential
        );
        assert!(controller.join_calls().is_empty());

        resolve_credential(&sender, "abc", CHANNEL, Some(LOCAL_ID));
        assert_eq!(handle.snapshot().await.unwrap().status, SessionStatus::Idle);

        handle.start_call().await.unwrap();
        assert_eq!(controller.join_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_start_call_before_initialize() {
        let (handle, controller) = spawn_with(ready_credential("abc", CHANNEL, None), None);

        let result = handle.start_call().await;

        assert!(matches!(result, Err(SessionError::NotInitialized)));
        assert_eq!(handle.snapshot().await.unwrap().status, SessionStatus::Idle);
        assert_eq!(controller.create_count(), 0);
    }

    #[tokio::test]
    async fn test_start_call_joins_with_credential_and_local_id() {
        let (handle, controller) = ready_session().await;

        let call_id = handle.start_call().await.unwrap();

        assert_eq!(
            controller.join_calls(),
            vec![EngineCall::JoinChannel {
                token: "abc".to_string(),
                channel: CHANNEL.to_string(),
                info: None,
                local_id: ParticipantId(LOCAL_ID),
            }]
        );
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Joining);
        assert!(!snapshot.is_active);
        assert_eq!(snapshot.call_id, Some(call_id));
    }

    #[tokio::test]
    async fn test_only_join_success_activates_session() {
        let (handle, controller) = ready_session().await;
        handle.start_call().await.unwrap();

        controller.emit_join_success(CHANNEL, LOCAL_ID);

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Joined);
        assert!(snapshot.is_active);
        assert_eq!(snapshot.local_participant_id, Some(ParticipantId(LOCAL_ID)));
    }

    #[tokio::test]
    async fn test_repeated_start_call_is_noop() {
        let (handle, controller) = ready_session().await;
        controller.auto_join_success();

        handle.start_call().await.unwrap();
        for _ in 0..3 {
            assert!(matches!(
                handle.start_call().await,
                Err(SessionError::InvalidTransition {
                    operation: "start_call",
                    status: SessionStatus::Joined,
                })
            ));
        }

        assert_eq!(controller.join_calls().len(), 1);
        assert_eq!(handle.snapshot().await.unwrap().status, SessionStatus::Joined);
    }

    #[tokio::test]
    async fn test_join_rejected_by_engine_returns_to_idle() {
        let (handle, controller) = ready_session().await;
        controller.fail_join(17);

        let result = handle.start_call().await;

        assert!(matches!(result, Err(SessionError::Engine(_))));
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Idle);
        assert_eq!(snapshot.call_id, None);
    }

    #[tokio::test]
    async fn test_engine_assigned_id_is_reconciled() {
        let (handle, controller) = spawn_with(ready_credential("abc", CHANNEL, None), None);
        handle
            .initialize(RolePolicy::Publisher, VideoEncoderConfig::default())
            .await
            .unwrap();
        controller.auto_join_success();

        handle.start_call().await.unwrap();

        assert!(matches!(
            controller.join_calls().first(),
            Some(EngineCall::JoinChannel { local_id, .. }) if local_id.is_unassigned()
        ));
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Joined);
        assert_eq!(snapshot.local_participant_id, Some(MOCK_ASSIGNED_ID));
    }

    #[tokio::test]
    async fn test_local_id_is_kept_out_of_roster() {
        let (handle, controller) = ready_session().await;
        handle.start_call().await.unwrap();

        // Reported before our own join success, then again after.
        controller.emit_user_joined(LOCAL_ID, 0);
        controller.emit_user_joined(5, 0);
        controller.emit_join_success(CHANNEL, LOCAL_ID);
        controller.emit_user_joined(LOCAL_ID, 3);

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.roster, vec![ParticipantId(5)]);
    }

    #[tokio::test]
    async fn test_roster_events_outside_call_are_ignored() {
        let (handle, controller) = ready_session().await;

        controller.emit_user_joined(77, 0);
        controller.emit_join_success(CHANNEL, LOCAL_ID);

        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.roster.is_empty());
        assert_eq!(snapshot.status, SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_warnings_and_errors_do_not_change_state() {
        let (handle, controller) = ready_session().await;
        controller.auto_join_success();
        handle.start_call().await.unwrap();
        controller.emit_user_joined(8, 0);
        let before = handle.snapshot().await.unwrap();

        controller.emit_warning(104);
        controller.emit_error(17);

        assert_eq!(handle.snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_end_call_clears_roster_even_when_leave_fails() {
        let (handle, controller) = ready_session().await;
        controller.auto_join_success();
        controller.fail_leave(3);
        handle.start_call().await.unwrap();
        controller.emit_user_joined(77, 0);
        controller.emit_user_joined(78, 0);

        handle.end_call().await.unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Idle);
        assert!(snapshot.roster.is_empty());
        assert!(!snapshot.is_active);
        assert_eq!(controller.leave_count(), 1);
    }

    #[tokio::test]
    async fn test_end_call_while_idle_is_refused_without_leave() {
        let (handle, controller) = ready_session().await;

        let result = handle.end_call().await;

        assert!(matches!(
            result,
            Err(SessionError::InvalidTransition {
                operation: "end_call",
                status: SessionStatus::Idle,
            })
        ));
        assert_eq!(controller.leave_count(), 0);
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Idle);
        assert!(snapshot.roster.is_empty());
    }

    #[tokio::test]
    async fn test_end_call_while_joining() {
        let (handle, controller) = ready_session().await;
        handle.start_call().await.unwrap();

        handle.end_call().await.unwrap();
        // Join success arriving after the leave is stale.
        controller.emit_join_success(CHANNEL, LOCAL_ID);

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Idle);
        assert_eq!(controller.leave_count(), 1);
    }

    #[tokio::test]
    async fn test_new_call_starts_with_empty_roster() {
        let (handle, controller) = ready_session().await;
        controller.auto_join_success();

        handle.start_call().await.unwrap();
        controller.emit_user_joined(1, 0);
        handle.end_call().await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().call_id, None);

        let second = handle.start_call().await.unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.roster.is_empty());
        assert_eq!(snapshot.status, SessionStatus::Joined);
        assert_eq!(snapshot.call_id, Some(second));
    }

    #[tokio::test]
    async fn test_subscribe_sees_status_changes() {
        let (handle, controller) = ready_session().await;
        let mut snapshots = handle.subscribe();
        controller.auto_join_success();

        handle.start_call().await.unwrap();

        let joined = tokio::time::timeout(
            Duration::from_secs(1),
            snapshots.wait_for(|s| s.status == SessionStatus::Joined),
        )
        .await
        .expect("timed out waiting for joined")
        .expect("snapshot channel closed")
        .clone();
        assert!(joined.is_active);
    }

    #[tokio::test]
    async fn test_cancel_while_joined_leaves_channel() {
        let (factory, controller) = MockEngineFactory::new();
        let cancel_token = CancellationToken::new();
        let (handle, task) = CallSessionActor::spawn(
            descriptor(),
            factory,
            ready_credential("abc", CHANNEL, None),
            None,
            cancel_token.clone(),
        );
        handle
            .initialize(RolePolicy::Publisher, VideoEncoderConfig::default())
            .await
            .unwrap();
        controller.auto_join_success();
        handle.start_call().await.unwrap();
        let mut snapshots = handle.subscribe();

        handle.cancel();
        assert!(handle.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("actor did not stop")
            .unwrap();

        assert_eq!(controller.leave_count(), 1);
        assert_eq!(snapshots.borrow_and_update().status, SessionStatus::Idle);
        assert!(matches!(
            handle.snapshot().await,
            Err(SessionError::Internal(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_queue_while_join_is_outstanding() {
        let (handle, controller) = ready_session().await;
        controller.delay_join(Duration::from_secs(2));

        let starter = handle.clone();
        let start = tokio::spawn(async move { starter.start_call().await });

        // Let the join reach the engine, then deliver events mid-join.
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.emit_user_joined(77, 0);
        controller.emit_user_joined(78, 0);

        start.await.unwrap().unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Joining);
        assert_eq!(snapshot.roster, vec![ParticipantId(77), ParticipantId(78)]);
    }
}
