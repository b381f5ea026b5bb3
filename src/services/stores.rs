//! Per-user persistence contracts.
//!
//! Credentials and preferences are both keyed by [`UserId`], so writes from
//! different users never conflict. Same-user concurrent writes are
//! last-write-wins at the storage layer.

use thiserror::Error;

use crate::domain::{Credential, UserId};
use crate::models::{Preferences, PreferencesPatch};

/// Infrastructure failure. The gateway treats storage as a precondition and
/// never tries to recover from these; they fail the request outright.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::Unavailable(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, user_id: UserId) -> Result<Option<Credential>, StoreError>;

    /// Upsert; replaces any earlier credential for the user. Callers validate
    /// the credential first.
    async fn put(&self, user_id: UserId, credential: &Credential) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Stored preferences, or defaults when the user never changed anything.
    async fn get(&self, user_id: UserId) -> Result<Preferences, StoreError>;

    /// Merges `patch` over the current value and returns what was written.
    async fn update(
        &self,
        user_id: UserId,
        patch: &PreferencesPatch,
    ) -> Result<Preferences, StoreError>;
}
