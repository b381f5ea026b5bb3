pub mod prelude;

pub mod credentials;
pub mod preferences;
pub mod search_cache;
