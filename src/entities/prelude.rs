pub use super::credentials::Entity as Credentials;
pub use super::preferences::Entity as Preferences;
pub use super::search_cache::Entity as SearchCache;
