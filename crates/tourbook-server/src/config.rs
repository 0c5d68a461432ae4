use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Redis configuration
    #[serde(default)]
    pub redis: RedisConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Upstream hotel API proxy configuration
    #[serde(default)]
    pub proxy: ProxyConfig,
    /// Seed data for the local read paths
    #[serde(default)]
    pub data: DataConfig,
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
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Cache validations
        if self.cache.enabled
            && (self.cache.hotel_list_ttl_secs == 0
                || self.cache.hotel_detail_ttl_secs == 0
                || self.cache.response_ttl_secs == 0)
        {
            return Err("cache TTLs must be > 0 when cache.enabled=true".into());
        }
        if self.cache.local_max_entries == 0 {
            return Err("cache.local_max_entries must be > 0".into());
        }
        if self.cache.response_max_body_bytes == 0 {
            return Err("cache.response_max_body_bytes must be > 0".into());
        }
        // Redis validation
        if self.redis.enabled && self.redis.url.is_empty() {
            return Err("redis.enabled=true requires redis.url".into());
        }
        // Proxy validations
        let base = &self.proxy.base_path;
        if !base.starts_with('/') || base.len() < 2 || base.ends_with('/') {
            return Err("proxy.base_path must start with '/' and not end with '/'".into());
        }
        if self.proxy.timeout_secs == 0 {
            return Err("proxy.timeout_secs must be > 0".into());
        }
        if !self.proxy.mock_upstream {
            let url = url::Url::parse(&self.proxy.upstream_url)
                .map_err(|e| format!("proxy.upstream_url is invalid: {e}"))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err("proxy.upstream_url must be http or https".into());
            }
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

/// Redis configuration for sharing the cache between instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis (gracefully degrades without it)
    /// Default: false (local cache only)
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
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
    2000
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

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Master switch; when off every read computes
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// TTL for hotel listing pages
    #[serde(default = "default_hotel_list_ttl_secs")]
    pub hotel_list_ttl_secs: u64,

    /// TTL for single hotel documents
    #[serde(default = "default_hotel_detail_ttl_secs")]
    pub hotel_detail_ttl_secs: u64,

    /// TTL for whole-response caching middleware
    #[serde(default = "default_response_ttl_secs")]
    pub response_ttl_secs: u64,

    /// Local (L1) cache max entries
    #[serde(default = "default_local_max_entries")]
    pub local_max_entries: usize,

    /// Largest response body the response cache will buffer and store.
    /// Bigger or unsized responses pass through uncached.
    #[serde(default = "default_response_max_body_bytes")]
    pub response_max_body_bytes: usize,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_hotel_list_ttl_secs() -> u64 {
    300
}

fn default_hotel_detail_ttl_secs() -> u64 {
    600
}

fn default_response_ttl_secs() -> u64 {
    300
}

fn default_local_max_entries() -> usize {
    10000
}

fn default_response_max_body_bytes() -> usize {
    1024 * 1024
}

impl CacheConfig {
    pub fn hotel_list_ttl(&self) -> Duration {
        Duration::from_secs(self.hotel_list_ttl_secs)
    }
    pub fn hotel_detail_ttl(&self) -> Duration {
        Duration::from_secs(self.hotel_detail_ttl_secs)
    }
    pub fn response_ttl(&self) -> Duration {
        Duration::from_secs(self.response_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            hotel_list_ttl_secs: default_hotel_list_ttl_secs(),
            hotel_detail_ttl_secs: default_hotel_detail_ttl_secs(),
            response_ttl_secs: default_response_ttl_secs(),
            local_max_entries: default_local_max_entries(),
            response_max_body_bytes: default_response_max_body_bytes(),
        }
    }
}

/// Reverse proxy to the third-party hotel API.
///
/// Requests under `base_path` are forwarded to `upstream_url` with the prefix
/// stripped and provider credentials injected. A 451 or transport failure is
/// answered from the fallback catalog when `fallback_enabled` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_base_path")]
    pub base_path: String,

    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Provider API key. Prefer TOURBOOK__PROXY__API_KEY over the file.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    #[serde(default = "default_api_host_header")]
    pub api_host_header: String,

    /// Value for the provider host header. Defaults to the upstream host.
    #[serde(default)]
    pub api_host: Option<String>,

    #[serde(default = "default_proxy_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_fallback_enabled")]
    pub fallback_enabled: bool,

    /// JSON file replacing the built-in fallback catalog
    #[serde(default)]
    pub fallback_file: Option<String>,

    /// Serve every proxied request from the fallback catalog without
    /// contacting the upstream
    #[serde(default)]
    pub mock_upstream: bool,
}

fn default_proxy_base_path() -> String {
    "/api/booking".into()
}
fn default_upstream_url() -> String {
    "https://booking-com.p.rapidapi.com".into()
}
fn default_api_key_header() -> String {
    "X-RapidAPI-Key".into()
}
fn default_api_host_header() -> String {
    "X-RapidAPI-Host".into()
}
fn default_proxy_timeout_secs() -> u64 {
    10
}
fn default_fallback_enabled() -> bool {
    true
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Provider host header value: explicit setting, else the upstream host.
    pub fn resolved_api_host(&self) -> Option<String> {
        self.api_host.clone().or_else(|| {
            url::Url::parse(&self.upstream_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
        })
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_path: default_proxy_base_path(),
            upstream_url: default_upstream_url(),
            api_key: None,
            api_key_header: default_api_key_header(),
            api_host_header: default_api_host_header(),
            api_host: None,
            timeout_secs: default_proxy_timeout_secs(),
            fallback_enabled: default_fallback_enabled(),
            fallback_file: None,
            mock_upstream: false,
        }
    }
}

/// Seed data for the hotel read paths
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DataConfig {
    /// JSON array of hotel documents. The built-in fixture is used when unset.
    #[serde(default)]
    pub hotels_file: Option<String>,
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    pub const DEFAULT_CONFIG_FILE: &str = "tourbook.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., TOURBOOK__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("TOURBOOK")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        // Validate
        merged.validate()?;
        Ok(merged)
    }

    pub fn load_config_with_default_path<P: AsRef<Path>>(
        path: Option<P>,
    ) -> Result<AppConfig, String> {
        let p = path
            .as_ref()
            .map(|p| p.as_ref().to_string_lossy().to_string());
        load_config(p.as_deref())
    }
}
