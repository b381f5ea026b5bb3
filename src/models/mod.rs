pub mod preferences;
pub mod result;

pub use preferences::{Preferences, PreferencesPatch};
pub use result::{InlineItem, InlineResponse, ItemKind, ResultRecord};
