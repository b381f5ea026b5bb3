use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

use crate::db::db_timestamp;
use crate::domain::{Locale, ResultLimit};
use crate::entities::{preferences, prelude::*};
use crate::models::Preferences as UserPreferences;

pub struct PreferenceRepository {
    conn: DatabaseConnection,
}

impl PreferenceRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<UserPreferences>> {
        let row = Preferences::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query preferences")?;

        row.map(Self::to_domain).transpose()
    }

    pub async fn upsert(&self, user_id: i64, prefs: &UserPreferences) -> Result<()> {
        let active_model = preferences::ActiveModel {
            user_id: Set(user_id),
            show_thumbnail: Set(prefs.show_thumbnail),
            result_limit: Set(i32::from(prefs.result_limit.get())),
            locale: Set(prefs.locale.as_ref().map(|l| l.as_str().to_string())),
            updated_at: Set(db_timestamp(chrono::Utc::now())),
        };

        Preferences::insert(active_model)
            .on_conflict(
                OnConflict::column(preferences::Column::UserId)
                    .update_columns([
                        preferences::Column::ShowThumbnail,
                        preferences::Column::ResultLimit,
                        preferences::Column::Locale,
                        preferences::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await
            .context("Failed to store preferences")?;

        Ok(())
    }

    fn to_domain(model: preferences::Model) -> Result<UserPreferences> {
        let result_limit = ResultLimit::new(i64::from(model.result_limit))
            .with_context(|| format!("Corrupt result_limit for user {}", model.user_id))?;
        let locale = model
            .locale
            .as_deref()
            .map(Locale::parse)
            .transpose()
            .with_context(|| format!("Corrupt locale for user {}", model.user_id))?;

        Ok(UserPreferences {
            show_thumbnail: model.show_thumbnail,
            result_limit,
            locale,
        })
    }
}
