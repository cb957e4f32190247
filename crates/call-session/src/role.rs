//! Role policy: publisher or viewer, decided once before joining.
//!
//! The assignment picks the engine client-role declaration and the render
//! surfaces the presentation layer should request.

use common::types::ParticipantId;
use rtc_engine::ClientRole;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Whether the local participant sends media or only receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Sends local media and is rendered as host.
    Publisher,
    /// Receives only.
    Viewer,
}

impl Role {
    /// Engine-side declaration for this role.
    #[must_use]
    pub const fn client_role(self) -> ClientRole {
        match self {
            Role::Publisher => ClientRole::Broadcaster,
            Role::Viewer => ClientRole::Audience,
        }
    }
}

/// Configured policy from which the assignment is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RolePolicy {
    /// Always publish.
    #[default]
    Publisher,
    /// Always view.
    Viewer,
    /// View, but render a local preview when joining without a
    /// participant-bound credential.
    ViewerWithPreview,
}

impl RolePolicy {
    /// Decide the role.
    ///
    /// `credential_gated` is true when the credential is bound to the local
    /// participant id, which disables the local preview of
    /// [`RolePolicy::ViewerWithPreview`].
    #[must_use]
    pub const fn assign(self, credential_gated: bool) -> RoleAssignment {
        match self {
            RolePolicy::Publisher => RoleAssignment {
                role: Role::Publisher,
                local_preview: false,
            },
            RolePolicy::Viewer => RoleAssignment {
                role: Role::Viewer,
                local_preview: false,
            },
            RolePolicy::ViewerWithPreview => RoleAssignment {
                role: Role::Viewer,
                local_preview: !credential_gated,
            },
        }
    }

    /// Config spelling of the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RolePolicy::Publisher => "publisher",
            RolePolicy::Viewer => "viewer",
            RolePolicy::ViewerWithPreview => "viewer-preview",
        }
    }
}

impl fmt::Display for RolePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RolePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "publisher" | "host" => Ok(RolePolicy::Publisher),
            "viewer" | "audience" => Ok(RolePolicy::Viewer),
            "viewer-preview" | "viewer_preview" => Ok(RolePolicy::ViewerWithPreview),
            other => Err(format!(
                "unknown role policy '{other}' (expected publisher, viewer or viewer-preview)"
            )),
        }
    }
}

/// A surface the presentation layer should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "participant", rename_all = "snake_case")]
pub enum RenderSurface {
    /// The local camera.
    Local,
    /// A remote participant's stream.
    Remote(ParticipantId),
}

/// Outcome of the role policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleAssignment {
    role: Role,
    local_preview: bool,
}

impl RoleAssignment {
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Whether the local participant publishes and is shown as host.
    #[must_use]
    pub const fn is_host(&self) -> bool {
        matches!(self.role, Role::Publisher)
    }

    /// Whether the local participant only receives.
    #[must_use]
    pub const fn is_viewer(&self) -> bool {
        matches!(self.role, Role::Viewer)
    }

    #[must_use]
    pub const fn client_role(&self) -> ClientRole {
        self.role.client_role()
    }

    /// Whether the local surface is rendered.
    #[must_use]
    pub const fn renders_local(&self) -> bool {
        self.is_host() || self.local_preview
    }

    /// Surfaces to request for the given roster, local first.
    #[must_use]
    pub fn surfaces(&self, roster: &[ParticipantId]) -> Vec<RenderSurface> {
        let local = self.renders_local().then_some(RenderSurface::Local);
        local
            .into_iter()
            .chain(roster.iter().copied().map(RenderSurface::Remote))
            .collect()
    }
}
