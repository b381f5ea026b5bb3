mod cache;
mod prefs;
mod search;
mod token;

pub use cache::cmd_cache_purge;
pub use prefs::{cmd_prefs_set, cmd_prefs_show};
pub use search::cmd_search;
pub use token::cmd_token;
