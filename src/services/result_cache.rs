//! Shared, time-bounded cache of normalized result sets.
//!
//! Entries are keyed by query text alone (optionally prefixed by locale), not
//! by credential, so one user's provider call serves everyone who types the
//! same thing within the TTL.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

use crate::domain::Locale;
use crate::models::ResultRecord;
use crate::services::stores::StoreError;

/// Separates the locale from the query text in locale-scoped keys. Trimmed
/// user text never starts with a control character, so the two key shapes
/// cannot collide.
const LOCALE_SEPARATOR: char = '\u{1f}';

/// Normalized lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// `"Cats"`, `"cats"` and `" cats "` all map to the same key.
    #[must_use]
    pub fn for_query(query: &str) -> Self {
        Self(normalize_query(query))
    }

    #[must_use]
    pub fn for_query_in_locale(query: &str, locale: Option<&Locale>) -> Self {
        match locale {
            Some(locale) => Self(format!(
                "{}{LOCALE_SEPARATOR}{}",
                locale.as_str(),
                normalize_query(query)
            )),
            None => Self::for_query(query),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[must_use]
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// A cached provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResultSet {
    pub records: Vec<ResultRecord>,

    pub stored_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,
}

impl CachedResultSet {
    /// Fresh up to and including the expiry instant; strictly older entries
    /// are treated as absent.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }
}

/// Time source for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for exercising TTL boundaries.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    #[must_use]
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
pub trait ResultCache: Send + Sync {
    /// Returns the entry for `key` unless it is missing or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResultSet>, StoreError>;

    /// Unconditional overwrite; never merges with an earlier entry.
    async fn put(
        &self,
        key: &CacheKey,
        records: &[ResultRecord],
        ttl: chrono::Duration,
    ) -> Result<(), StoreError>;

    /// Deletes expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}
