use crate::models::{Preferences, ResultRecord};
use crate::services::result_cache::CachedResultSet;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

/// Timestamps are stored as fixed-width RFC 3339 UTC strings
/// (`2025-06-01T12:00:00.000Z`) so SQL string comparison is chronological.
#[must_use]
pub fn db_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_db_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Invalid stored timestamp: {raw}"))
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Every pooled connection to `:memory:` would see its own empty database.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn credential_repo(&self) -> repositories::credential::CredentialRepository {
        repositories::credential::CredentialRepository::new(self.conn.clone())
    }

    fn preference_repo(&self) -> repositories::preference::PreferenceRepository {
        repositories::preference::PreferenceRepository::new(self.conn.clone())
    }

    fn cache_repo(&self) -> repositories::cache::CacheRepository {
        repositories::cache::CacheRepository::new(self.conn.clone())
    }

    pub async fn get_credential(&self, user_id: i64) -> Result<Option<String>> {
        self.credential_repo().get(user_id).await
    }

    pub async fn upsert_credential(&self, user_id: i64, api_key: &str) -> Result<()> {
        self.credential_repo().upsert(user_id, api_key).await
    }

    pub async fn get_preferences(&self, user_id: i64) -> Result<Option<Preferences>> {
        self.preference_repo().get(user_id).await
    }

    pub async fn upsert_preferences(&self, user_id: i64, prefs: &Preferences) -> Result<()> {
        self.preference_repo().upsert(user_id, prefs).await
    }

    pub async fn get_cached_search(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CachedResultSet>> {
        self.cache_repo().get_cached_search(key, now).await
    }

    pub async fn cache_search_results(
        &self,
        key: &str,
        records: &[ResultRecord],
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<()> {
        self.cache_repo()
            .cache_search_results(key, records, now, ttl)
            .await
    }

    pub async fn purge_expired_cache(&self, now: DateTime<Utc>) -> Result<u64> {
        self.cache_repo().purge_expired(now).await
    }
}
