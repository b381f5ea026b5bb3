//! Query resolution: cache first, then the user's own provider credential.
//!
//! ```text
//! START → (CACHE_HIT | CACHE_MISS) → [NO_CREDENTIAL | PROVIDER_CALL]
//!       → (SUCCESS | PROVIDER_FAILED) → DONE
//! ```
//!
//! A hit never touches the credential store or the provider, so users without
//! a key still see results somebody else already paid for.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::domain::UserId;
use crate::models::{InlineItem, InlineResponse, Preferences, ResultRecord};
use crate::services::notifier::Notifier;
use crate::services::result_cache::{CacheKey, ResultCache};
use crate::services::search_provider::{ProviderError, SearchProvider};
use crate::services::stores::{CredentialStore, PreferenceStore, StoreError};

pub const NEED_TOKEN_NOTICE_ID: &str = "need_token";
pub const PROVIDER_ERROR_NOTICE_ID: &str = "err";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Knobs the resolver needs from configuration.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Minimum number of records requested upstream on a miss.
    pub fetch_size: u8,

    pub ttl: chrono::Duration,

    pub key_by_locale: bool,

    pub cache_time: u32,

    pub bot_username: String,

    pub admin_contact: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ResolverSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            fetch_size: config.search.fetch_size,
            ttl: config.cache.ttl(),
            key_by_locale: config.cache.key_by_locale,
            cache_time: config.search.cache_time_seconds,
            bot_username: config.notices.bot_username.clone(),
            admin_contact: config.notices.admin_contact.clone(),
        }
    }
}

pub struct QueryResolver {
    credentials: Arc<dyn CredentialStore>,
    preferences: Arc<dyn PreferenceStore>,
    cache: Arc<dyn ResultCache>,
    provider: Arc<dyn SearchProvider>,
    notifier: Arc<dyn Notifier>,
    settings: ResolverSettings,
}

impl QueryResolver {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        preferences: Arc<dyn PreferenceStore>,
        cache: Arc<dyn ResultCache>,
        provider: Arc<dyn SearchProvider>,
        notifier: Arc<dyn Notifier>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            credentials,
            preferences,
            cache,
            provider,
            notifier,
            settings,
        }
    }

    /// Resolves one inline query for `user_id`.
    ///
    /// # Errors
    ///
    /// Only storage failures surface as errors. A missing credential or a
    /// provider failure is answered with a notice item instead.
    #[instrument(skip(self, query), fields(user_id = %user_id))]
    pub async fn resolve(
        &self,
        user_id: UserId,
        query: &str,
    ) -> Result<InlineResponse, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(InlineResponse::empty(self.settings.cache_time));
        }

        let prefs = self.preferences.get(user_id).await?;
        let key = if self.settings.key_by_locale {
            CacheKey::for_query_in_locale(query, prefs.locale.as_ref())
        } else {
            CacheKey::for_query(query)
        };

        if let Some(cached) = self.cache.get(&key).await? {
            metrics::counter!("search_cache_hits_total").increment(1);
            debug!(cached = cached.records.len(), "Serving inline query from cache");
            return Ok(self.respond(project(cached.records, &prefs)));
        }
        metrics::counter!("search_cache_misses_total").increment(1);

        let Some(credential) = self.credentials.get(user_id).await? else {
            debug!("Cache miss and no credential, asking user to register a key");
            return Ok(self.respond_with(self.need_token_notice()));
        };

        let fetch = prefs.result_limit.get().max(self.settings.fetch_size);
        metrics::counter!("provider_calls_total").increment(1);

        match self
            .provider
            .search(&credential, query, fetch, prefs.locale.as_ref())
            .await
        {
            Ok(records) => {
                info!(count = records.len(), fetch, "Provider call succeeded");
                // An empty answer is not cached; the next request asks again.
                if !records.is_empty()
                    && let Err(e) = self.cache.put(&key, &records, self.settings.ttl).await
                {
                    warn!(error = %e, "Failed to cache search results");
                }
                Ok(self.respond(project(records, &prefs)))
            }
            Err(e) => {
                metrics::counter!("provider_errors_total", "status" => e.status_label())
                    .increment(1);
                warn!(error = %e, "Provider call failed");
                self.notifier
                    .notify(user_id, self.failure_message(&e))
                    .await;
                Ok(self.respond_with(Self::provider_error_notice()))
            }
        }
    }

    fn respond(&self, records: Vec<ResultRecord>) -> InlineResponse {
        InlineResponse {
            items: records.into_iter().map(InlineItem::from_record).collect(),
            cache_time: self.settings.cache_time,
        }
    }

    fn respond_with(&self, notice: InlineItem) -> InlineResponse {
        InlineResponse {
            items: vec![notice],
            cache_time: self.settings.cache_time,
        }
    }

    fn need_token_notice(&self) -> InlineItem {
        let bot = &self.settings.bot_username;
        InlineItem::notice(
            NEED_TOKEN_NOTICE_ID,
            "Add a Google API key",
            format!("Open @{bot} and send /token"),
            format!(
                "To get search results, add a Google API key.\nOpen a chat with @{bot} and send /token"
            ),
        )
    }

    fn provider_error_notice() -> InlineItem {
        InlineItem::notice(
            PROVIDER_ERROR_NOTICE_ID,
            "Search failed",
            "An error occurred. Details were sent to you in a private message.",
            "Unfortunately, the search failed.",
        )
    }

    fn failure_message(&self, err: &ProviderError) -> String {
        format!(
            "Search failed: {err}\nIf the problem persists, contact {}",
            self.settings.admin_contact
        )
    }
}

/// Applies display preferences: drops thumbnails when disabled and keeps the
/// first `result_limit` records. Applying it twice changes nothing.
#[must_use]
pub fn project(records: Vec<ResultRecord>, prefs: &Preferences) -> Vec<ResultRecord> {
    records
        .into_iter()
        .take(prefs.result_limit.as_usize())
        .map(|mut record| {
            if !prefs.show_thumbnail {
                record.thumbnail = None;
            }
            record
        })
        .collect()
}
