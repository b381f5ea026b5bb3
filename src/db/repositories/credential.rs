use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

use crate::db::db_timestamp;
use crate::entities::{credentials, prelude::*};

pub struct CredentialRepository {
    conn: DatabaseConnection,
}

impl CredentialRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<String>> {
        let row = Credentials::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query credential")?;

        Ok(row.map(|m| m.api_key))
    }

    /// Inserts or replaces the user's key. `created_at` survives a replace.
    pub async fn upsert(&self, user_id: i64, api_key: &str) -> Result<()> {
        let now = db_timestamp(chrono::Utc::now());

        let active_model = credentials::ActiveModel {
            user_id: Set(user_id),
            api_key: Set(api_key.to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        Credentials::insert(active_model)
            .on_conflict(
                OnConflict::column(credentials::Column::UserId)
                    .update_columns([
                        credentials::Column::ApiKey,
                        credentials::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await
            .context("Failed to store credential")?;

        Ok(())
    }
}
