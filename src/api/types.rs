use serde::{Deserialize, Serialize};

use crate::domain::UserId;
use crate::models::Preferences;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InlineQueryRequest {
    pub user_id: i64,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct OnboardingInputRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct OnboardingStatusDto {
    pub user_id: UserId,
    pub awaiting: bool,
}

#[derive(Debug, Serialize)]
pub struct PreferencesDto {
    pub user_id: UserId,
    pub show_thumbnail: bool,
    pub result_limit: u8,
    pub locale: Option<String>,
}

impl PreferencesDto {
    #[must_use]
    pub fn new(user_id: UserId, prefs: &Preferences) -> Self {
        Self {
            user_id,
            show_thumbnail: prefs.show_thumbnail,
            result_limit: prefs.result_limit.get(),
            locale: prefs.locale.as_ref().map(ToString::to_string),
        }
    }
}

/// Absent fields are left untouched; `locale: ""` clears the locale.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub show_thumbnail: Option<bool>,
    pub result_limit: Option<i64>,
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CachePurgeDto {
    pub removed: u64,
}
