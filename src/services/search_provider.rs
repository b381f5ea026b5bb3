//! External search provider contract.

use thiserror::Error;

use crate::domain::{Credential, Locale};
use crate::models::ResultRecord;

/// A failed provider call. `status` is `None` for transport failures,
/// timeouts included.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.describe())]
pub struct ProviderError {
    pub status: Option<u16>,

    pub message: String,
}

impl ProviderError {
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self.status, Some(429))
    }

    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self.status, Some(401 | 403))
    }

    /// Label used for the `status` metric dimension.
    #[must_use]
    pub fn status_label(&self) -> String {
        self.status
            .map_or_else(|| "transport".to_string(), |s| s.to_string())
    }

    fn describe(&self) -> String {
        match self.status {
            Some(status) => format!("HTTP {status}: {}", self.message),
            None => format!("Transport error: {}", self.message),
        }
    }
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Makes exactly one upstream call and returns at most `limit` records in
    /// provider order.
    async fn search(
        &self,
        credential: &Credential,
        query: &str,
        limit: u8,
        locale: Option<&Locale>,
    ) -> Result<Vec<ResultRecord>, ProviderError>;
}
