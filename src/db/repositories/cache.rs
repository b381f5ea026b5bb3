use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::db::{db_timestamp, parse_db_timestamp};
use crate::entities::{prelude::*, search_cache};
use crate::models::ResultRecord;
use crate::services::result_cache::CachedResultSet;

pub struct CacheRepository {
    conn: DatabaseConnection,
}

impl CacheRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_cached_search(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CachedResultSet>> {
        let entry = SearchCache::find()
            .filter(search_cache::Column::Query.eq(key))
            .filter(search_cache::Column::ExpiresAt.gte(db_timestamp(now)))
            .one(&self.conn)
            .await?;

        let Some(e) = entry else {
            return Ok(None);
        };

        let records: Vec<ResultRecord> = serde_json::from_str(&e.results_json)?;
        Ok(Some(CachedResultSet {
            records,
            stored_at: parse_db_timestamp(&e.created_at)?,
            expires_at: parse_db_timestamp(&e.expires_at)?,
        }))
    }

    pub async fn cache_search_results(
        &self,
        key: &str,
        records: &[ResultRecord],
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<()> {
        let results_json = serde_json::to_string(records)?;

        // Writes already take the lock, so expired rows are swept here too.
        self.purge_expired(now).await?;

        let active_model = search_cache::ActiveModel {
            query: Set(key.to_string()),
            results_json: Set(results_json),
            created_at: Set(db_timestamp(now)),
            expires_at: Set(db_timestamp(now + ttl)),
            ..Default::default()
        };

        SearchCache::insert(active_model)
            .on_conflict(
                OnConflict::column(search_cache::Column::Query)
                    .update_columns([
                        search_cache::Column::ResultsJson,
                        search_cache::Column::CreatedAt,
                        search_cache::Column::ExpiresAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = SearchCache::delete_many()
            .filter(search_cache::Column::ExpiresAt.lt(db_timestamp(now)))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }
}
