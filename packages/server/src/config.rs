use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// QR check-in settings.
#[derive(Debug, Deserialize, Clone)]
pub struct CheckinConfig {
    /// Session lifetime used when the teacher does not pick one. Default: 10.
    #[serde(default = "default_ttl_minutes")]
    pub default_ttl_minutes: i64,
    /// Upper bound for a requested session lifetime. Default: 240.
    #[serde(default = "default_max_ttl_minutes")]
    pub max_ttl_minutes: i64,
    /// When set, QR payloads carry an HMAC-SHA256 signature over the session id.
    #[serde(default)]
    pub token_secret: Option<String>,
    /// Buffered events per live feed subscriber. Default: 256.
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
}

fn default_ttl_minutes() -> i64 {
    10
}
fn default_max_ttl_minutes() -> i64 {
    240
}
fn default_feed_capacity() -> usize {
    256
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            default_ttl_minutes: default_ttl_minutes(),
            max_ttl_minutes: default_max_ttl_minutes(),
            token_secret: None,
            feed_capacity: default_feed_capacity(),
        }
    }
}

/// Record store write limits.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Maximum writes committed in one transaction. Default: 500.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    500
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub checkin: CheckinConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., ROLLCALL__CHECKIN__TOKEN_SECRET)
            .add_source(Environment::with_prefix("ROLLCALL").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
