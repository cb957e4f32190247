//! Process-start flow for a call client.
//!
//! 1. Prompt for media permissions on platforms that need it
//! 2. Allocate a local participant id (personalized variant only)
//! 3. Start the background credential fetch
//! 4. Spawn the session actor and initialize the engine
//!
//! The credential fetch is not awaited: `start_call` is refused until it
//! resolves.

use crate::actors::{CallSessionActor, CallSessionHandle};
use crate::config::Config;
use crate::errors::SessionError;
use crate::permissions::{request_if_required, MediaPermissions, PermissionOutcome};
use crate::role::RoleAssignment;

use common::credential::{spawn_credential_fetch, CredentialProvider, CredentialProviderConfig};
use common::identity::IdentityAllocator;
use common::types::ParticipantId;
use rtc_engine::{RtcEngineFactory, VideoEncoderConfig};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// A running call client: the session actor plus its background tasks.
pub struct CallClient {
    session: CallSessionHandle,
    role: RoleAssignment,
    local_id: Option<ParticipantId>,
    permission: Option<PermissionOutcome>,
    cancel_token: CancellationToken,
    actor_task: JoinHandle<()>,
    credential_task: JoinHandle<()>,
}

impl CallClient {
    /// Run the startup flow and return a client ready for `start_call`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Config` if the identity allocator or credential
    /// provider cannot be built, or the `initialize` error if the engine
    /// cannot be created or configured. Background tasks are stopped before
    /// returning an error.
    #[instrument(skip_all, name = "session.bootstrap", fields(channel = %config.channel_name))]
    pub async fn start<F: RtcEngineFactory>(
        config: &Config,
        factory: F,
        permissions: &dyn MediaPermissions,
    ) -> Result<Self, SessionError> {
        info!(
            target: "session.bootstrap",
            platform = %config.platform,
            role_policy = %config.role_policy,
            personalized = config.personalized_credential,
            "Starting call client"
        );

        let permission = request_if_required(config.platform, permissions).await;

        let local_id = if config.personalized_credential {
            let mut allocator = IdentityAllocator::with_digits(config.uid_digits)
                .map_err(|e| SessionError::Config(e.to_string()))?;
            Some(allocator.allocate())
        } else {
            None
        };

        let provider = CredentialProvider::new(
            CredentialProviderConfig::new(config.credential_issuer_url.clone())
                .with_http_timeout(config.credential_http_timeout),
        )
        .map_err(|e| SessionError::Config(e.to_string()))?;

        let (credential_task, credential) =
            spawn_credential_fetch(provider, config.channel_name.clone(), local_id);

        let cancel_token = CancellationToken::new();
        let (session, actor_task) = CallSessionActor::spawn(
            config.channel_descriptor(),
            factory,
            credential,
            local_id,
            cancel_token.child_token(),
        );

        let video = VideoEncoderConfig {
            frame_rate: config.video_frame_rate,
        };
        let role = match session.initialize(config.role_policy, video).await {
            Ok(role) => role,
            Err(e) => {
                warn!(
                    target: "session.bootstrap",
                    error = %e,
                    "Session initialization failed, stopping"
                );
                cancel_token.cancel();
                credential_task.abort();
                let _ = actor_task.await;
                return Err(e);
            }
        };

        info!(
            target: "session.bootstrap",
            local_id = ?local_id,
            is_host = role.is_host(),
            "Call client ready"
        );

        Ok(Self {
            session,
            role,
            local_id,
            permission,
            cancel_token,
            actor_task,
            credential_task,
        })
    }

    /// Handle for `start_call`, `end_call` and snapshots.
    #[must_use]
    pub fn session(&self) -> &CallSessionHandle {
        &self.session
    }

    #[must_use]
    pub fn role(&self) -> RoleAssignment {
        self.role
    }

    /// Locally allocated id, `None` in the shared-credential variant.
    #[must_use]
    pub fn local_id(&self) -> Option<ParticipantId> {
        self.local_id
    }

    /// Permission prompt outcome, `None` if no prompt was shown.
    #[must_use]
    pub fn permission(&self) -> Option<PermissionOutcome> {
        self.permission
    }

    /// End any active call and stop all tasks.
    pub async fn shutdown(self) {
        info!(target: "session.bootstrap", "Shutting down call client");

        self.cancel_token.cancel();
        if let Err(e) = self.actor_task.await {
            warn!(
                target: "session.bootstrap",
                error = %e,
                "Session actor task ended abnormally"
            );
        }

        if !self.credential_task.is_finished() {
            self.credential_task.abort();
        }

        info!(target: "session.bootstrap", "Call client stopped");
    }
}
