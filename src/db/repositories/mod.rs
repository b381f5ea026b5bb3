pub mod cache;
pub mod credential;
pub mod preference;
