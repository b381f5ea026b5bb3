//! Domain events for the application.
//!
//! These events travel over the event bus and reach the transport adapter
//! through the SSE stream. They are the side channel for anything a user
//! must learn about outside the inline result list.

use serde::Serialize;

use super::UserId;

/// Events sent to connected clients via SSE (Server-Sent Events).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationEvent {
    /// A message the transport should deliver privately to one user.
    UserNotice { user_id: UserId, message: String },

    /// A credential passed its canary call and was stored.
    CredentialCommitted { user_id: UserId },
}

impl NotificationEvent {
    /// SSE event name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UserNotice { .. } => "user_notice",
            Self::CredentialCommitted { .. } => "credential_committed",
        }
    }

    #[must_use]
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::UserNotice { user_id, .. } | Self::CredentialCommitted { user_id } => *user_id,
        }
    }
}
