//! Application configuration.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Session configuration.
    pub auth: AuthConfig,
    /// Page size defaults.
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Request rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin of the web frontend allowed by CORS. Any origin when unset.
    #[serde(default)]
    pub frontend_url: Option<String>,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign session tokens.
    pub jwt_secret: String,
    /// Session lifetime in hours.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Whether the session cookie is marked `Secure`.
    #[serde(default)]
    pub secure_cookie: bool,
}

/// Default and maximum page sizes.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    /// Default page size for comment replies.
    #[serde(default = "default_reply_limit")]
    pub reply_limit: u64,
    /// Default page size for user-scoped lists (submitted posts, bookmarks).
    #[serde(default = "default_user_list_limit")]
    pub user_list_limit: u64,
    /// Default page size for community feeds, personal feeds and comments.
    #[serde(default = "default_feed_limit")]
    pub feed_limit: u64,
    /// Upper bound for any requested page size.
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
}

/// Fixed-window rate limiting.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Whether the limiter is installed.
    #[serde(default)]
    pub enabled: bool,
    /// Maximum requests per window.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            reply_limit: default_reply_limit(),
            user_list_limit: default_user_list_limit(),
            feed_limit: default_feed_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_session_ttl_hours() -> i64 {
    3
}

fn default_cookie_name() -> String {
    "authToken".to_string()
}

const fn default_reply_limit() -> u64 {
    4
}

const fn default_user_list_limit() -> u64 {
    6
}

const fn default_feed_limit() -> u64 {
    10
}

const fn default_max_limit() -> u64 {
    100
}

const fn default_max_requests() -> u32 {
    40
}

const fn default_window_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `AGORA_ENV`)
    /// 4. Environment variables with `AGORA_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("AGORA_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("AGORA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
