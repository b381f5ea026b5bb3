//! Domain types for the search gateway with strong typing.
//!
//! This module provides type-safe wrappers for the values that cross the
//! gateway boundary: who is asking, how many results they want, which region
//! they search from and which provider credential they hold. Every wrapper
//! validates on construction so downstream code never re-checks.

pub mod events;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// Validation failures for domain primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Result limit must be between {min} and {max}, got {0}", min = ResultLimit::MIN, max = ResultLimit::MAX)]
    InvalidLimit(i64),

    #[error("Locale must be a 2-letter region code, got '{0}'")]
    InvalidLocale(String),

    #[error("Credential does not look like a provider API key")]
    InvalidCredentialFormat,
}

/// Chat-platform user identifier.
///
/// Platform ids do not fit in 32 bits, hence i64.
///
/// # Examples
///
/// ```rust
/// use searchgate::domain::UserId;
///
/// let id = UserId::new(42);
/// assert_eq!(id.value(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UserId(i64);

impl UserId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self::new(id)
    }
}

impl Serialize for UserId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i64::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

/// Number of results a user wants to see, always within `[1, 10]`.
///
/// The upper bound is the provider's per-request maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResultLimit(u8);

impl ResultLimit {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;
    pub const DEFAULT: Self = Self(5);

    pub fn new(value: i64) -> Result<Self, DomainError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(DomainError::InvalidLimit(value))
    }

    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl Default for ResultLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ResultLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ResultLimit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for ResultLimit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Two-letter region code passed to the provider as its geolocation hint.
///
/// Stored lower-case so `"DE"` and `"de"` are the same locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale(String);

impl Locale {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_lowercase()))
        } else {
            Err(DomainError::InvalidLocale(raw.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Locale {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Locale {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

static CREDENTIAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^AIza[0-9A-Za-z_\-]{35}$").expect("credential pattern is a valid regex")
});

/// A provider API key owned by exactly one user.
///
/// Construction only checks the syntax; whether the key actually works is
/// decided by the onboarding canary call. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Parses a candidate key, trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let candidate = raw.trim();
        if CREDENTIAL_PATTERN.is_match(candidate) {
            Ok(Self(candidate.to_string()))
        } else {
            Err(DomainError::InvalidCredentialFormat)
        }
    }

    /// Wraps a value read back from storage. It was validated before it was
    /// written, so it is not re-checked.
    #[must_use]
    pub const fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short form safe for logs, e.g. `AIza…f3Qx`.
    #[must_use]
    pub fn redacted(&self) -> String {
        let tail: String = self
            .0
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("AIza…{tail}")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.redacted()).finish()
    }
}
