use serde::{Deserialize, Serialize};

use crate::domain::{Locale, ResultLimit};

/// Per-user display and query preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub show_thumbnail: bool,

    pub result_limit: ResultLimit,

    pub locale: Option<Locale>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            show_thumbnail: true,
            result_limit: ResultLimit::DEFAULT,
            locale: None,
        }
    }
}

impl Preferences {
    /// Applies only the fields present in `patch`.
    #[must_use]
    pub fn merged(mut self, patch: &PreferencesPatch) -> Self {
        if let Some(show_thumbnail) = patch.show_thumbnail {
            self.show_thumbnail = show_thumbnail;
        }
        if let Some(limit) = patch.result_limit {
            self.result_limit = limit;
        }
        if let Some(locale) = &patch.locale {
            self.locale.clone_from(locale);
        }
        self
    }
}

/// Partial update for [`Preferences`].
///
/// `locale: Some(None)` clears the locale, `locale: None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesPatch {
    pub show_thumbnail: Option<bool>,

    pub result_limit: Option<ResultLimit>,

    pub locale: Option<Option<Locale>>,
}

impl PreferencesPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.show_thumbnail.is_none() && self.result_limit.is_none() && self.locale.is_none()
    }
}
