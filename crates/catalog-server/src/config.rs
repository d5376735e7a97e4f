use catalog_cache::{CacheOptions, LockOptions};
use catalog_db_postgres::PostgresConfig;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Redis configuration (volatile store and pub/sub)
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default derived via field defaults

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        // Storage validations
        if self.storage.backend == StorageBackend::Postgres {
            if self.storage.postgres.url.trim().is_empty() {
                return Err("storage.backend=postgres requires storage.postgres.url".into());
            }
            if self.storage.postgres.pool_size == 0 {
                return Err("storage.postgres.pool_size must be > 0".into());
            }
        }
        // Redis validations
        if self.redis.enabled {
            if self.redis.url.trim().is_empty() {
                return Err("redis.enabled=true requires redis.url".into());
            }
            if self.redis.pool_size == 0 {
                return Err("redis.pool_size must be > 0".into());
            }
        }
        // Cache validations
        if self.cache.ttl_secs == 0 {
            return Err("cache.ttl_secs must be > 0".into());
        }
        if self.cache.scan_batch_size == 0 {
            return Err("cache.scan_batch_size must be > 0".into());
        }
        // Lock validations
        if self.lock.ttl_ms == 0 {
            return Err("lock.ttl_ms must be > 0".into());
        }
        if self.lock.max_attempts == 0 {
            return Err("lock.max_attempts must be > 0".into());
        }
        if self.lock.retry_unit_ms == 0 {
            return Err("lock.retry_unit_ms must be > 0".into());
        }
        // Events validation
        if self.events.channel.trim().is_empty() {
            return Err("events.channel must not be empty".into());
        }
        if self.events.reconnect_delay_ms == 0 {
            return Err("events.reconnect_delay_ms must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            ttl: Duration::from_secs(self.cache.ttl_secs),
            scan_batch_size: self.cache.scan_batch_size,
        }
    }

    pub fn lock_options(&self) -> LockOptions {
        LockOptions {
            ttl: Duration::from_millis(self.lock.ttl_ms),
            max_attempts: self.lock.max_attempts,
            retry_unit: Duration::from_millis(self.lock.retry_unit_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Which source store backs the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Used when `backend = "postgres"`
    #[serde(default)]
    pub postgres: PostgresConfig,
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis (gracefully degrades to in-process store without it)
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// Read-through cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL of cached ratings, reviews and review pages
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Keys per SCAN batch during prefix invalidation
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,
}

fn default_cache_ttl_secs() -> u64 {
    3600 // 1 hour
}

fn default_scan_batch_size() -> usize {
    100
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            scan_batch_size: default_scan_batch_size(),
        }
    }
}

/// Per-product lock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Lock expiry; must exceed the slowest expected cache fill
    #[serde(default = "default_lock_ttl_ms")]
    pub ttl_ms: u64,

    #[serde(default = "default_lock_max_attempts")]
    pub max_attempts: u32,

    /// Wait after failed attempt n is n * retry_unit_ms
    #[serde(default = "default_lock_retry_unit_ms")]
    pub retry_unit_ms: u64,
}

fn default_lock_ttl_ms() -> u64 {
    10_000
}

fn default_lock_max_attempts() -> u32 {
    5
}

fn default_lock_retry_unit_ms() -> u64 {
    1000
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_lock_ttl_ms(),
            max_attempts: default_lock_max_attempts(),
            retry_unit_ms: default_lock_retry_unit_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Pub/sub channel receiving catalog change events
    #[serde(default = "default_events_channel")]
    pub channel: String,

    /// Delay before a dropped subscriber connection is retried
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

fn default_events_channel() -> String {
    catalog_core::REVIEWS_TOPIC.to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

impl EventsConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel: default_events_channel(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_PATH: &str = "catalog.toml";
    pub const CONFIG_PATH_ENV: &str = "CATALOG_CONFIG";

    /// How the configuration path was determined.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ConfigSource {
        /// From --config CLI argument
        CliArgument,
        /// From CATALOG_CONFIG environment variable
        EnvironmentVariable,
        /// Default path (catalog.toml)
        Default,
    }

    impl std::fmt::Display for ConfigSource {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::CliArgument => write!(f, "CLI argument (--config)"),
                Self::EnvironmentVariable => write!(f, "environment variable (CATALOG_CONFIG)"),
                Self::Default => write!(f, "default"),
            }
        }
    }

    /// Resolves the config path from `--config <path>`, then `CATALOG_CONFIG`,
    /// then the default.
    pub fn resolve_config_path(
        args: impl IntoIterator<Item = String>,
        env_value: Option<String>,
    ) -> (String, ConfigSource) {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg == "--config" {
                if let Some(path) = args.next() {
                    return (path, ConfigSource::CliArgument);
                }
            }
        }

        if let Some(path) = env_value.filter(|p| !p.is_empty()) {
            return (path, ConfigSource::EnvironmentVariable);
        }

        (DEFAULT_CONFIG_PATH.to_string(), ConfigSource::Default)
    }

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        let mut builder = Config::builder();
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., CATALOG__REDIS__URL=redis://cache:6379
        builder = builder.add_source(
            Environment::with_prefix("CATALOG")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
        assert!(!cfg.redis.enabled);
        assert_eq!(cfg.events.channel, "reviews");

        let lock = cfg.lock_options();
        assert_eq!(lock.ttl, Duration::from_secs(10));
        assert_eq!(lock.max_attempts, 5);
        assert_eq!(cfg.cache_options().ttl, Duration::from_secs(3600));
        assert_eq!(cfg.cache_options().scan_batch_size, 100);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.lock.max_attempts = 0;
        assert!(cfg.validate().unwrap_err().contains("lock.max_attempts"));

        let mut cfg = AppConfig::default();
        cfg.cache.ttl_secs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.events.reconnect_delay_ms = 0;
        assert!(cfg.validate().unwrap_err().contains("events.reconnect_delay_ms"));

        let mut cfg = AppConfig::default();
        cfg.logging.level = "verbose".into();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.storage.backend = StorageBackend::Postgres;
        cfg.storage.postgres.url = String::new();
        assert!(cfg.validate().unwrap_err().contains("storage.postgres.url"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9090

[storage]
backend = "postgres"

[storage.postgres]
url = "postgres://catalog:secret@db/catalog"

[lock]
retry_unit_ms = 250

[events]
reconnect_delay_ms = 1500
"#,
        )
        .unwrap();

        let cfg = loader::load_config(path.to_str()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.storage.backend, StorageBackend::Postgres);
        assert_eq!(cfg.storage.postgres.pool_size, 10);
        assert_eq!(cfg.lock_options().retry_unit, Duration::from_millis(250));
        assert_eq!(cfg.lock.max_attempts, 5);
        assert_eq!(cfg.events.channel, "reviews");
        assert_eq!(cfg.events.reconnect_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn test_config_path_resolution_order() {
        use loader::{ConfigSource, resolve_config_path};

        let args = vec!["--config".to_string(), "/etc/catalog.toml".to_string()];
        assert_eq!(
            resolve_config_path(args, Some("env.toml".into())),
            ("/etc/catalog.toml".to_string(), ConfigSource::CliArgument)
        );
        assert_eq!(
            resolve_config_path(Vec::new(), Some("env.toml".into())),
            ("env.toml".to_string(), ConfigSource::EnvironmentVariable)
        );
        assert_eq!(
            resolve_config_path(vec!["--config".to_string()], Some(String::new())),
            ("catalog.toml".to_string(), ConfigSource::Default)
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg = loader::load_config(Some("/nonexistent/catalog.toml")).unwrap();
        assert_eq!(cfg.server.port, 8080);
    }
}
