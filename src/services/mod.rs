pub mod notifier;
pub use notifier::{EventBusNotifier, Notifier};

pub mod onboarding;
pub use onboarding::{OnboardingError, OnboardingFlow, Reply, SessionEvent, SessionState};

pub mod resolver;
pub use resolver::{QueryResolver, ResolveError, ResolverSettings};

pub mod result_cache;
pub use result_cache::{CacheKey, CachedResultSet, Clock, ManualClock, ResultCache, SystemClock};

pub mod result_cache_impl;
pub use result_cache_impl::{MemoryResultCache, SeaOrmResultCache};

pub mod search_provider;
pub use search_provider::{ProviderError, SearchProvider};

pub mod stores;
pub use stores::{CredentialStore, PreferenceStore, StoreError};

pub mod stores_impl;
pub use stores_impl::{SeaOrmCredentialStore, SeaOrmPreferenceStore};
