use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One normalized search hit.
///
/// `title` and `link` are always present. A missing thumbnail is `None`, never
/// an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub title: String,

    pub link: String,

    #[serde(default)]
    pub snippet: String,

    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Result,
    Notice,
}

/// A display item handed to the transport for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineItem {
    pub id: String,

    pub kind: ItemKind,

    pub title: String,

    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    /// Text the transport posts when the user picks this item.
    pub message_text: String,
}

impl InlineItem {
    /// Builds a result item with a fresh random id, so identical queries never
    /// produce colliding ids at the transport layer.
    #[must_use]
    pub fn from_record(record: ResultRecord) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: ItemKind::Result,
            message_text: record.link.clone(),
            url: Some(record.link),
            title: record.title,
            description: record.snippet,
            thumbnail_url: record.thumbnail,
        }
    }

    #[must_use]
    pub fn notice(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        message_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Notice,
            title: title.into(),
            description: description.into(),
            url: None,
            thumbnail_url: None,
            message_text: message_text.into(),
        }
    }

    #[must_use]
    pub fn is_notice(&self) -> bool {
        self.kind == ItemKind::Notice
    }
}

/// What the gateway returns for one inline query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineResponse {
    pub items: Vec<InlineItem>,

    /// Recommended transport-side cache time. Freshness is governed by the
    /// gateway's own cache, so this stays close to zero.
    pub cache_time: u32,
}

impl InlineResponse {
    #[must_use]
    pub const fn empty(cache_time: u32) -> Self {
        Self {
            items: Vec::new(),
            cache_time,
        }
    }
}
