//! `SeaORM` implementations of the per-user stores.

use async_trait::async_trait;
use tracing::debug;

use crate::db::Store;
use crate::domain::{Credential, UserId};
use crate::models::{Preferences, PreferencesPatch};
use crate::services::stores::{CredentialStore, PreferenceStore, StoreError};

pub struct SeaOrmCredentialStore {
    store: Store,
}

impl SeaOrmCredentialStore {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialStore for SeaOrmCredentialStore {
    async fn get(&self, user_id: UserId) -> Result<Option<Credential>, StoreError> {
        let raw = self.store.get_credential(user_id.value()).await?;
        Ok(raw.map(Credential::from_stored))
    }

    async fn put(&self, user_id: UserId, credential: &Credential) -> Result<(), StoreError> {
        self.store
            .upsert_credential(user_id.value(), credential.expose())
            .await?;
        debug!(user_id = %user_id, "Credential stored");
        Ok(())
    }
}

pub struct SeaOrmPreferenceStore {
    store: Store,
}

impl SeaOrmPreferenceStore {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PreferenceStore for SeaOrmPreferenceStore {
    async fn get(&self, user_id: UserId) -> Result<Preferences, StoreError> {
        let stored = self.store.get_preferences(user_id.value()).await?;
        Ok(stored.unwrap_or_default())
    }

    async fn update(
        &self,
        user_id: UserId,
        patch: &PreferencesPatch,
    ) -> Result<Preferences, StoreError> {
        let merged = self.get(user_id).await?.merged(patch);
        self.store
            .upsert_preferences(user_id.value(), &merged)
            .await?;
        debug!(user_id = %user_id, ?merged, "Preferences updated");
        Ok(merged)
    }
}
