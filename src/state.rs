use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

use crate::clients::google::GoogleSearchClient;
use crate::config::{CacheBackend, Config};
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::services::{
    Clock, CredentialStore, EventBusNotifier, MemoryResultCache, OnboardingFlow, PreferenceStore,
    QueryResolver, ResolverSettings, ResultCache, SeaOrmCredentialStore, SeaOrmPreferenceStore,
    SeaOrmResultCache, SearchProvider, SystemClock,
};

/// Build a shared HTTP client for provider calls.
/// Reused across requests so connections are pooled.
fn build_shared_http_client(timeout_seconds: u64, user_agent: &str) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent(user_agent)
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub event_bus: broadcast::Sender<NotificationEvent>,

    pub credentials: Arc<dyn CredentialStore>,

    pub preferences: Arc<dyn PreferenceStore>,

    pub cache: Arc<dyn ResultCache>,

    pub provider: Arc<dyn SearchProvider>,

    pub resolver: Arc<QueryResolver>,

    pub onboarding: Arc<OnboardingFlow>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size);
        Self::with_event_bus(config, event_bus).await
    }

    pub async fn with_event_bus(
        config: Config,
        event_bus: broadcast::Sender<NotificationEvent>,
    ) -> anyhow::Result<Self> {
        let http_client = build_shared_http_client(
            config.provider.request_timeout_seconds,
            &config.provider.user_agent,
        )?;
        let provider = Arc::new(GoogleSearchClient::new(
            http_client,
            config.provider.endpoint.clone(),
            config.provider.collection_id.clone(),
        ));

        Self::with_components(config, event_bus, provider, Arc::new(SystemClock)).await
    }

    /// Wires the pipeline around an explicit provider and clock.
    pub async fn with_components(
        config: Config,
        event_bus: broadcast::Sender<NotificationEvent>,
        provider: Arc<dyn SearchProvider>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let credentials: Arc<dyn CredentialStore> =
            Arc::new(SeaOrmCredentialStore::new(store.clone()));
        let preferences: Arc<dyn PreferenceStore> =
            Arc::new(SeaOrmPreferenceStore::new(store.clone()));

        let cache: Arc<dyn ResultCache> = match config.cache.backend {
            CacheBackend::Database => Arc::new(SeaOrmResultCache::new(store.clone(), clock)),
            CacheBackend::Memory => Arc::new(MemoryResultCache::new(clock)),
        };

        let notifier = Arc::new(EventBusNotifier::new(event_bus.clone()));

        let resolver = Arc::new(QueryResolver::new(
            credentials.clone(),
            preferences.clone(),
            cache.clone(),
            provider.clone(),
            notifier,
            ResolverSettings::from_config(&config),
        ));

        let onboarding = Arc::new(OnboardingFlow::new(
            provider.clone(),
            credentials.clone(),
            event_bus.clone(),
            config.onboarding.canary_query.clone(),
        ));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            event_bus,
            credentials,
            preferences,
            cache,
            provider,
            resolver,
            onboarding,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
