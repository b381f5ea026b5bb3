use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub provider: ProviderConfig,

    pub search: SearchConfig,

    pub cache: CacheConfig,

    pub onboarding: OnboardingConfig,

    pub notices: NoticesConfig,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    #[serde(default)]
    pub suppress_connection_errors: bool,

    /// Event bus buffer size (default: 100)
    pub event_bus_buffer_size: usize,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/searchgate.db".to_string(),
            log_level: "info".to_string(),
            suppress_connection_errors: false,
            event_bus_buffer_size: 100,
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub endpoint: String,

    /// Programmable Search Engine id (`cx`). Overridden by `GOOGLE_CX`.
    pub collection_id: String,

    /// Per-call timeout in seconds (default: 10)
    pub request_timeout_seconds: u64,

    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
            collection_id: String::new(),
            request_timeout_seconds: 10,
            user_agent: format!("searchgate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// How many results to request upstream on a cache miss. The resolver
    /// asks for `max(fetch_size, user limit)` so the cached entry can serve
    /// any later user (default: 10, the provider maximum)
    pub fetch_size: u8,

    /// Transport-side cache time recommended with every response
    pub cache_time_seconds: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fetch_size: 10,
            cache_time_seconds: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// `search_cache` table in the main database
    Database,
    /// Process memory; lost on restart
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    pub ttl_hours: u32,

    /// Key entries by (locale, query) instead of query alone. Off by default,
    /// which pools quota across users regardless of their locale.
    pub key_by_locale: bool,

    /// How often the daemon purges expired entries (0 disables)
    pub purge_interval_minutes: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Database,
            ttl_hours: 24,
            key_by_locale: false,
            purge_interval_minutes: 60,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.ttl_hours))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingConfig {
    /// Cheap query used to prove a candidate key works
    pub canary_query: String,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            canary_query: "4:20".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoticesConfig {
    /// Bot handle shown in the "register a key" notice, without the `@`
    pub bot_username: String,

    /// Who users should contact when searches keep failing
    pub admin_contact: String,
}

impl Default for NoticesConfig {
    fn default() -> Self {
        Self {
            bot_username: "inlinegooglesearchbot".to_string(),
            admin_contact: "the bot administrator".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Shared secret the transport adapter must send as `X-Api-Key` or a
    /// bearer token. When unset the API is open; bind it to localhost then.
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 6790,
            cors_allowed_origins: vec!["http://localhost:6790".to_string()],
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "searchgate".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Secrets usually live in the environment (or a `.env` file) rather than
    /// in `config.toml`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(cx) = std::env::var("GOOGLE_CX")
            && !cx.trim().is_empty()
        {
            self.provider.collection_id = cx.trim().to_string();
        }

        if let Ok(key) = std::env::var("SEARCHGATE_API_KEY")
            && !key.trim().is_empty()
        {
            self.server.api_key = Some(key.trim().to_string());
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("searchgate").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".searchgate").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider.endpoint.trim().is_empty() {
            anyhow::bail!("Provider endpoint cannot be empty");
        }

        if self.provider.request_timeout_seconds == 0 {
            anyhow::bail!("Provider request timeout must be > 0");
        }

        if !(1..=10).contains(&self.search.fetch_size) {
            anyhow::bail!(
                "search.fetch_size must be between 1 and 10, got {}",
                self.search.fetch_size
            );
        }

        if self.cache.ttl_hours == 0 {
            anyhow::bail!("Cache TTL must be > 0 hours");
        }

        if self.provider.collection_id.is_empty() {
            tracing::warn!("provider.collection_id is empty; set GOOGLE_CX or searches will fail");
        }

        Ok(())
    }
}
