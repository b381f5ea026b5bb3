use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::domain::{Credential, Locale};
use crate::models::ResultRecord;
use crate::services::search_provider::{ProviderError, SearchProvider};

pub const GOOGLE_CSE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Upper bound on how much of a non-JSON error body ends up in a message.
const ERROR_BODY_LIMIT: usize = 512;

/// Google Custom Search JSON API client.
///
/// The API key comes from the calling user; the search engine id (`cx`) is
/// shared by the whole deployment.
#[derive(Clone)]
pub struct GoogleSearchClient {
    client: Client,
    endpoint: String,
    collection_id: String,
}

impl GoogleSearchClient {
    #[must_use]
    pub fn new(client: Client, endpoint: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            collection_id: collection_id.into(),
        }
    }

    fn request_url(
        &self,
        credential: &Credential,
        query: &str,
        limit: u8,
        locale: Option<&Locale>,
    ) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| ProviderError::transport(format!("Invalid endpoint: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("key", credential.expose())
                .append_pair("cx", &self.collection_id)
                .append_pair("q", query)
                .append_pair("num", &limit.to_string());
            if let Some(locale) = locale {
                pairs.append_pair("gl", locale.as_str());
            }
        }

        Ok(url)
    }
}

#[async_trait::async_trait]
impl SearchProvider for GoogleSearchClient {
    async fn search(
        &self,
        credential: &Credential,
        query: &str,
        limit: u8,
        locale: Option<&Locale>,
    ) -> Result<Vec<ResultRecord>, ProviderError> {
        let url = self.request_url(credential, query, limit, locale)?;

        debug!(query = %query, limit, locale = ?locale.map(Locale::as_str), "Calling Google Custom Search");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::transport(transport_message(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body);
            warn!(status = status.as_u16(), error = %message, "Google Custom Search returned an error");
            return Err(ProviderError::http(status.as_u16(), message));
        }

        let raw: Value = response.json().await.map_err(|e| {
            ProviderError::http(status.as_u16(), format!("Malformed response body: {e}"))
        })?;

        let records = normalize_response(&raw, limit, status.as_u16())?;
        debug!(query = %query, count = records.len(), "Google Custom Search completed");
        Ok(records)
    }
}

fn transport_message(err: reqwest::Error) -> String {
    if err.is_timeout() {
        "Request timed out".to_string()
    } else if err.is_connect() {
        "Could not connect to the search provider".to_string()
    } else {
        // The URL carries the user's key.
        err.without_url().to_string()
    }
}

/// Prefers `error.message` from a JSON error body, otherwise the raw body
/// truncated to [`ERROR_BODY_LIMIT`] characters.
#[must_use]
pub fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body)
        && let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
    {
        return message.to_string();
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "Empty error response".to_string();
    }
    trimmed.chars().take(ERROR_BODY_LIMIT).collect()
}

/// Turns a raw response document into records.
///
/// Missing `items` means no results. Every item must carry string `title`
/// and `link` fields; the first one that doesn't fails the whole response.
pub fn normalize_response(
    raw: &Value,
    limit: u8,
    status: u16,
) -> Result<Vec<ResultRecord>, ProviderError> {
    let Some(items) = raw.get("items").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    items
        .iter()
        .take(usize::from(limit))
        .enumerate()
        .map(|(index, item)| {
            let title = required_str(item, "title", index, status)?;
            let link = required_str(item, "link", index, status)?;
            Ok(ResultRecord {
                title,
                link,
                snippet: item
                    .get("snippet")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                thumbnail: thumbnail_of(item),
            })
        })
        .collect()
}

fn required_str(
    item: &Value,
    field: &str,
    index: usize,
    status: u16,
) -> Result<String, ProviderError> {
    item.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::http(
                status,
                format!("Result item {index} is missing required field '{field}'"),
            )
        })
}

/// `pagemap.cse_thumbnail[0].src`, then `pagemap.metatags[0]["og:image"]`.
fn thumbnail_of(item: &Value) -> Option<String> {
    let pagemap = item.get("pagemap")?;

    let first_str = |list: &str, field: &str| {
        pagemap
            .get(list)
            .and_then(Value::as_array)
            .and_then(|entries| entries.first())
            .and_then(|entry| entry.get(field))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    first_str("cse_thumbnail", "src").or_else(|| first_str("metatags", "og:image"))
}
