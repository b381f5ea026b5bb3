//! Credential onboarding dialogue.
//!
//! A user asks to register a key, sends a candidate, and the candidate is
//! committed only after one successful canary query made with it. Sessions
//! live in process memory; a restart simply forgets half-finished dialogues.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, broadcast};
use tracing::{debug, info, instrument, warn};

use crate::domain::events::NotificationEvent;
use crate::domain::{Credential, UserId};
use crate::services::search_provider::SearchProvider;
use crate::services::stores::{CredentialStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingCandidate,
    /// Behaves exactly like `Idle` for later input.
    Committed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Begin,
    Cancel,
    RejectedFormat,
    RejectedByProvider,
    Accepted,
}

impl SessionState {
    #[must_use]
    pub const fn transition(self, event: SessionEvent) -> Self {
        match (self, event) {
            (_, SessionEvent::Begin) => Self::AwaitingCandidate,
            (_, SessionEvent::Cancel) => Self::Idle,
            (
                Self::AwaitingCandidate,
                SessionEvent::RejectedFormat | SessionEvent::RejectedByProvider,
            ) => Self::AwaitingCandidate,
            (Self::AwaitingCandidate, SessionEvent::Accepted) => Self::Committed,
            (state, _) => state,
        }
    }

    #[must_use]
    pub const fn is_awaiting(self) -> bool {
        matches!(self, Self::AwaitingCandidate)
    }
}

/// What the transport should tell the user after an onboarding step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    AwaitingCandidate,
    InvalidFormat,
    Rejected { detail: String },
    Committed,
    Cancelled,
    NotAwaiting,
    Superseded,
}

impl Reply {
    #[must_use]
    pub const fn status(&self) -> &'static str {
        match self {
            Self::AwaitingCandidate => "awaiting_candidate",
            Self::InvalidFormat => "invalid_format",
            Self::Rejected { .. } => "rejected",
            Self::Committed => "committed",
            Self::Cancelled => "cancelled",
            Self::NotAwaiting => "not_awaiting",
            Self::Superseded => "superseded",
        }
    }

    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::AwaitingCandidate => concat!(
                "Adding a Google API key\n\n",
                "1. Create a key in the Google Cloud Console ",
                "(https://console.cloud.google.com/apis/credentials), type \"API key\".\n",
                "2. Make sure the Custom Search JSON API is enabled for the project.\n",
                "3. Send only the key, in a single message."
            )
            .to_string(),
            Self::InvalidFormat => {
                "This does not look like a Google API key. Try again or /cancel.".to_string()
            }
            Self::Rejected { detail } => format!("The test query failed: {detail}"),
            Self::Committed => "Key saved! You can start searching.".to_string(),
            Self::Cancelled => "Key registration cancelled.".to_string(),
            Self::NotAwaiting => {
                "No key registration in progress. Send /token to start one.".to_string()
            }
            Self::Superseded => {
                "This key was not saved because the registration was restarted or cancelled."
                    .to_string()
            }
        }
    }
}

impl Serialize for Reply {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct ReplyBody {
            status: &'static str,
            message: String,
        }

        ReplyBody {
            status: self.status(),
            message: self.message(),
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default)]
struct Session {
    state: SessionState,
    /// Bumped on every `begin` and `cancel`; a canary result is only applied
    /// if the generation it started under is still current.
    generation: u64,
}

pub struct OnboardingFlow {
    sessions: Mutex<HashMap<UserId, Session>>,
    /// Per-user guard held from the accepted transition until the key is
    /// stored. `begin` and `cancel` take it too, so they land before or after
    /// a commit, never in the middle of one.
    commits: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
    provider: Arc<dyn SearchProvider>,
    credentials: Arc<dyn CredentialStore>,
    event_bus: broadcast::Sender<NotificationEvent>,
    canary_query: String,
}

impl OnboardingFlow {
    #[must_use]
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        credentials: Arc<dyn CredentialStore>,
        event_bus: broadcast::Sender<NotificationEvent>,
        canary_query: impl Into<String>,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            commits: Mutex::new(HashMap::new()),
            provider,
            credentials,
            event_bus,
            canary_query: canary_query.into(),
        }
    }

    pub async fn begin(&self, user_id: UserId) -> Reply {
        let _commit = self.commit_guard(user_id).await;
        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(user_id).or_default();
        session.state = session.state.transition(SessionEvent::Begin);
        session.generation += 1;
        debug!(user_id = %user_id, generation = session.generation, "Onboarding started");
        Reply::AwaitingCandidate
    }

    pub async fn is_awaiting(&self, user_id: UserId) -> bool {
        self.sessions
            .lock()
            .await
            .get(&user_id)
            .is_some_and(|s| s.state.is_awaiting())
    }

    pub async fn cancel(&self, user_id: UserId) -> Reply {
        let _commit = self.commit_guard(user_id).await;
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(&user_id) {
            session.state = session.state.transition(SessionEvent::Cancel);
            session.generation += 1;
        }
        Reply::Cancelled
    }

    /// Handles free text sent while a session may be awaiting a key.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardingError::Store`] if a validated key cannot be saved.
    /// The session stays awaiting in that case.
    ///
    /// A `begin` or `cancel` that arrives while the key is being written waits
    /// for the write, then starts from the committed state.
    #[instrument(skip(self, text), fields(user_id = %user_id))]
    pub async fn submit(&self, user_id: UserId, text: &str) -> Result<Reply, OnboardingError> {
        let Some(generation) = self.awaiting_generation(user_id).await else {
            return Ok(Reply::NotAwaiting);
        };

        let Ok(credential) = Credential::parse(text) else {
            self.apply(user_id, generation, SessionEvent::RejectedFormat)
                .await;
            return Ok(Reply::InvalidFormat);
        };

        let outcome = self
            .provider
            .search(&credential, &self.canary_query, 1, None)
            .await;

        match outcome {
            Err(e) => {
                if !self
                    .apply(user_id, generation, SessionEvent::RejectedByProvider)
                    .await
                {
                    return Ok(Reply::Superseded);
                }
                info!(error = %e, "Candidate key rejected by provider");
                Ok(Reply::Rejected {
                    detail: e.to_string(),
                })
            }
            Ok(_) => {
                let _commit = self.commit_guard(user_id).await;
                if !self.apply(user_id, generation, SessionEvent::Accepted).await {
                    debug!("Canary result discarded, session moved on");
                    return Ok(Reply::Superseded);
                }

                if let Err(e) = self.credentials.put(user_id, &credential).await {
                    warn!(error = %e, "Failed to store validated key");
                    self.restore_awaiting(user_id, generation).await;
                    return Err(e.into());
                }

                metrics::counter!("onboarding_commits_total").increment(1);
                info!("Credential committed");
                let _ = self
                    .event_bus
                    .send(NotificationEvent::CredentialCommitted { user_id });
                Ok(Reply::Committed)
            }
        }
    }

    async fn commit_guard(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = self
            .commits
            .lock()
            .await
            .entry(user_id)
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    async fn awaiting_generation(&self, user_id: UserId) -> Option<u64> {
        self.sessions
            .lock()
            .await
            .get(&user_id)
            .filter(|s| s.state.is_awaiting())
            .map(|s| s.generation)
    }

    /// Applies `event` if the session is still awaiting under `generation`.
    async fn apply(&self, user_id: UserId, generation: u64, event: SessionEvent) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(&user_id) {
            Some(session) if session.generation == generation && session.state.is_awaiting() => {
                session.state = session.state.transition(event);
                true
            }
            _ => false,
        }
    }

    async fn restore_awaiting(&self, user_id: UserId, generation: u64) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(&user_id)
            && session.generation == generation
            && session.state == SessionState::Committed
        {
            session.state = SessionState::AwaitingCandidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_EVENTS: [SessionEvent; 5] = [
        SessionEvent::Begin,
        SessionEvent::Cancel,
        SessionEvent::RejectedFormat,
        SessionEvent::RejectedByProvider,
        SessionEvent::Accepted,
    ];

    #[test]
    fn begin_and_cancel_work_from_any_state() {
        for state in [
            SessionState::Idle,
            SessionState::AwaitingCandidate,
            SessionState::Committed,
        ] {
            assert_eq!(
                state.transition(SessionEvent::Begin),
                SessionState::AwaitingCandidate
            );
            assert_eq!(state.transition(SessionEvent::Cancel), SessionState::Idle);
        }
    }

    #[test]
    fn rejections_keep_awaiting() {
        let awaiting = SessionState::AwaitingCandidate;
        assert_eq!(awaiting.transition(SessionEvent::RejectedFormat), awaiting);
        assert_eq!(awaiting.transition(SessionEvent::RejectedByProvider), awaiting);
        assert_eq!(
            awaiting.transition(SessionEvent::Accepted),
            SessionState::Committed
        );
    }

    #[test]
    fn idle_and_committed_ignore_candidate_events() {
        for state in [SessionState::Idle, SessionState::Committed] {
            for event in &ALL_EVENTS[2..] {
                assert_eq!(state.transition(*event), state);
            }
            assert!(!state.is_awaiting());
        }
    }

    #[test]
    fn reply_serializes_status_and_message() {
        let json = serde_json::to_value(Reply::Rejected {
            detail: "HTTP 403: API key not valid".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "rejected");
        assert!(
            json["message"]
                .as_str()
                .unwrap()
                .contains("API key not valid")
        );

        let json = serde_json::to_value(Reply::NotAwaiting).unwrap();
        assert_eq!(json["status"], "not_awaiting");
    }
}
