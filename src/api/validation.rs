use super::ApiError;
use crate::domain::{Locale, ResultLimit, UserId};

/// Inline queries longer than this are rejected before they reach the
/// resolver. Chat platforms cap inline query text at 256 characters.
pub const MAX_QUERY_CHARS: usize = 256;

pub fn validate_user_id(id: i64) -> Result<UserId, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid user ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(UserId::new(id))
}

pub fn validate_result_limit(limit: i64) -> Result<ResultLimit, ApiError> {
    ResultLimit::new(limit).map_err(|e| ApiError::validation(e.to_string()))
}

/// An empty string clears the locale.
pub fn validate_locale(raw: &str) -> Result<Option<Locale>, ApiError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    Locale::parse(raw)
        .map(Some)
        .map_err(|e| ApiError::validation(e.to_string()))
}

/// Whitespace-only queries are allowed; they resolve to an empty result set.
pub fn validate_inline_query(query: &str) -> Result<&str, ApiError> {
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(ApiError::validation(format!(
            "Query must be {MAX_QUERY_CHARS} characters or less"
        )));
    }
    Ok(query)
}
