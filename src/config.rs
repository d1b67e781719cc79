use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub cache: CacheConfig,

    pub providers: ProvidersConfig,

    pub email: EmailConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

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
            database_path: "sqlite:data/knowbase.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 5000,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Durable store in the configured SQLite database.
    Sqlite,
    /// Process-local map, lost on restart.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Lifetime of a cached aggregate (default: 3600 = 1 hour)
    pub ttl_seconds: u64,

    /// Deadline for the upstream fan-out of a single search (default: 20)
    pub search_timeout_seconds: u64,

    /// How often expired rows are physically removed. 0 disables the job.
    pub purge_interval_minutes: u32,

    /// Cron expression overriding `purge_interval_minutes`.
    pub purge_cron: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Sqlite,
            ttl_seconds: 60 * 60,
            search_timeout_seconds: 20,
            purge_interval_minutes: 30,
            purge_cron: None,
        }
    }
}

/// Upper bound for `cache.ttl_seconds`: one year.
pub const MAX_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

impl CacheConfig {
    pub fn ttl(&self) -> Result<chrono::Duration> {
        i64::try_from(self.ttl_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .with_context(|| format!("Cache TTL of {}s is out of range", self.ttl_seconds))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub stackexchange: StackExchangeConfig,

    pub reddit: RedditConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackExchangeConfig {
    pub base_url: String,

    pub site: String,

    pub order: String,

    pub sort: String,

    /// Named API filter; `withbody` includes question bodies.
    pub filter: String,

    pub user_agent: String,

    pub request_timeout_seconds: u64,
}

impl Default for StackExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.stackexchange.com".to_string(),
            site: "stackoverflow".to_string(),
            order: "desc".to_string(),
            sort: "votes".to_string(),
            filter: "withbody".to_string(),
            user_agent: "KnowledgeBaseApp/1.0.0".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub base_url: String,

    pub sort: String,

    pub limit: u32,

    /// Sent on every request; Reddit throttles generic agents.
    pub user_agent: String,

    pub request_timeout_seconds: u64,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.reddit.com".to_string(),
            sort: "relevance".to_string(),
            limit: 10,
            user_agent: "KnowledgeBaseApp/1.0.0".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,

    /// HTTP endpoint of the mail relay that accepts JSON messages.
    pub relay_url: String,

    /// Bearer token for the relay. Prefer `EMAIL_API_KEY` in the environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub from_address: String,

    pub request_timeout_seconds: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            relay_url: String::new(),
            api_key: None,
            from_address: String::new(),
            request_timeout_seconds: 15,
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
        labels.insert("app".to_string(), "knowbase".to_string());

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
        // A missing .env is fine; values already in the environment win.
        let _ = dotenvy::dotenv();

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
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Applies the environment variables the service has always honoured.
    pub fn apply_env_overrides<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var("DATABASE_URL") {
            self.general.database_path = url;
        }

        if let Some(port) = var("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port}"))?;
        }

        if let Some(user) = var("EMAIL_USER") {
            self.email.from_address = user;
        }

        if let Some(key) = var("EMAIL_API_KEY") {
            self.email.api_key = Some(key);
        }

        Ok(())
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
            paths.push(config_dir.join("knowbase").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".knowbase").join("config.toml"));
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
        if self.cache.ttl_seconds == 0 {
            anyhow::bail!("Cache TTL must be > 0");
        }

        if self.cache.ttl_seconds > MAX_TTL_SECONDS {
            anyhow::bail!("Cache TTL must be at most {MAX_TTL_SECONDS} seconds (one year)");
        }

        if self.cache.search_timeout_seconds == 0 {
            anyhow::bail!("Search timeout must be > 0");
        }

        if self.providers.stackexchange.base_url.is_empty() {
            anyhow::bail!("Stack Exchange base URL cannot be empty");
        }

        if self.providers.reddit.base_url.is_empty() {
            anyhow::bail!("Reddit base URL cannot be empty");
        }

        if self.providers.reddit.limit == 0 {
            anyhow::bail!("Reddit result limit must be > 0");
        }

        if self.email.enabled {
            if self.email.relay_url.is_empty() {
                anyhow::bail!("Email relay URL cannot be empty when email is enabled");
            }
            if self.email.from_address.is_empty() {
                anyhow::bail!("Email sender address cannot be empty when email is enabled");
            }
        }

        Ok(())
    }
}
