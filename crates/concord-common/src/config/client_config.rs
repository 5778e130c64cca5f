//! Client configuration
//!
//! Loads gateway client settings from environment variables (and a `.env`
//! file when present). Every optional setting has a default; only the bot
//! token is required. Programmatic users can start from
//! [`ClientConfig::new`] and override with the `with_*` methods.

use concord_core::cache::{DEFAULT_MESSAGE_CAPACITY, DEFAULT_MESSAGE_MAX_AGE};
use concord_core::Intents;
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Gateway client configuration
#[derive(Clone)]
pub struct ClientConfig {
    /// Bot token, sent in Identify and in the REST `Authorization` header
    pub token: String,
    /// REST base URL (without trailing slash)
    pub api_base_url: String,
    /// Gateway URL; discovered over REST when absent
    pub gateway_url: Option<String>,
    /// Gateway protocol version
    pub gateway_version: u8,
    pub intents: Intents,
    pub shard: ShardConfig,
    pub reconnect: ReconnectConfig,
    /// How long after a drop a session may still be resumed
    pub resume_window: Duration,
    /// Maximum number of listener invocations running at once
    pub dispatch_workers: usize,
    /// Member count above which a server is sent without offline members
    pub large_threshold: u16,
    pub message_cache: MessageCacheConfig,
    pub env: Environment,
    /// Trace every gateway frame
    pub log_frames: bool,
}

/// Shard this client connects as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardConfig {
    pub id: u32,
    pub count: u32,
}

impl ShardConfig {
    /// Whether the shard pair must be sent in Identify
    #[must_use]
    pub fn is_sharded(&self) -> bool {
        self.count > 1
    }
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self { id: 0, count: 1 }
    }
}

/// Reconnect backoff settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// First retry delay
    pub base: Duration,
    /// Upper bound of any retry delay
    pub max: Duration,
    /// A connection that stays up this long resets the attempt counter
    pub stable_window: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(default_reconnect_base_ms()),
            max: Duration::from_millis(default_reconnect_max_ms()),
            stable_window: Duration::from_secs(default_stable_window_secs()),
        }
    }
}

/// Bounds of the default entity cache's message store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageCacheConfig {
    /// Messages kept per channel; zero disables message caching
    pub capacity: usize,
    /// Age after which a cached message is dropped; zero keeps them forever
    pub max_age: Duration,
}

impl Default for MessageCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_MESSAGE_CAPACITY,
            max_age: DEFAULT_MESSAGE_MAX_AGE,
        }
    }
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

// Default value functions
fn default_api_base_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_gateway_version() -> u8 {
    10
}

fn default_reconnect_base_ms() -> u64 {
    1_000
}

fn default_reconnect_max_ms() -> u64 {
    60_000
}

fn default_stable_window_secs() -> u64 {
    60
}

fn default_resume_window_secs() -> u64 {
    120 // 2 minutes
}

fn default_dispatch_workers() -> usize {
    16
}

fn default_large_threshold() -> u16 {
    250
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base_url: default_api_base_url(),
            gateway_url: None,
            gateway_version: default_gateway_version(),
            intents: Intents::default(),
            shard: ShardConfig::default(),
            reconnect: ReconnectConfig::default(),
            resume_window: Duration::from_secs(default_resume_window_secs()),
            dispatch_workers: default_dispatch_workers(),
            large_threshold: default_large_threshold(),
            message_cache: MessageCacheConfig::default(),
            env: Environment::default(),
            log_frames: false,
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `BOT_TOKEN` is missing or a set variable cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingVar("BOT_TOKEN"))?;

        let config = Self {
            token,
            api_base_url: lookup("API_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(default_api_base_url),
            gateway_url: lookup("GATEWAY_URL").filter(|s| !s.is_empty()),
            gateway_version: parse_var(&lookup, "GATEWAY_VERSION")?
                .unwrap_or_else(default_gateway_version),
            intents: lookup("GATEWAY_INTENTS")
                .map(|s| {
                    Intents::parse(&s)
                        .map_err(|e| ConfigError::InvalidValue("GATEWAY_INTENTS", e.to_string()))
                })
                .transpose()?
                .unwrap_or_default(),
            shard: ShardConfig {
                id: parse_var(&lookup, "SHARD_ID")?.unwrap_or(0),
                count: parse_var(&lookup, "SHARD_COUNT")?.unwrap_or(1),
            },
            reconnect: ReconnectConfig {
                base: Duration::from_millis(
                    parse_var(&lookup, "RECONNECT_BASE_MS")?
                        .unwrap_or_else(default_reconnect_base_ms),
                ),
                max: Duration::from_millis(
                    parse_var(&lookup, "RECONNECT_MAX_MS")?
                        .unwrap_or_else(default_reconnect_max_ms),
                ),
                stable_window: Duration::from_secs(
                    parse_var(&lookup, "RECONNECT_STABLE_WINDOW_SECS")?
                        .unwrap_or_else(default_stable_window_secs),
                ),
            },
            resume_window: Duration::from_secs(
                parse_var(&lookup, "RESUME_WINDOW_SECS")?
                    .unwrap_or_else(default_resume_window_secs),
            ),
            dispatch_workers: parse_var(&lookup, "DISPATCH_WORKERS")?
                .unwrap_or_else(default_dispatch_workers),
            large_threshold: parse_var(&lookup, "LARGE_THRESHOLD")?
                .unwrap_or_else(default_large_threshold),
            message_cache: MessageCacheConfig {
                capacity: parse_var(&lookup, "MESSAGE_CACHE_CAPACITY")?
                    .unwrap_or(DEFAULT_MESSAGE_CAPACITY),
                max_age: parse_var(&lookup, "MESSAGE_CACHE_MAX_AGE_SECS")?
                    .map_or(DEFAULT_MESSAGE_MAX_AGE, Duration::from_secs),
            },
            env: lookup("APP_ENV")
                .and_then(|s| Environment::parse(&s))
                .unwrap_or_default(),
            log_frames: parse_var(&lookup, "LOG_GATEWAY_FRAMES")?.unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shard.count == 0 || self.shard.id >= self.shard.count {
            return Err(ConfigError::InvalidValue(
                "SHARD_ID",
                format!("shard {} out of range for count {}", self.shard.id, self.shard.count),
            ));
        }
        if self.dispatch_workers == 0 {
            return Err(ConfigError::InvalidValue(
                "DISPATCH_WORKERS",
                "must be at least 1".to_string(),
            ));
        }
        if self.reconnect.base > self.reconnect.max {
            return Err(ConfigError::InvalidValue(
                "RECONNECT_BASE_MS",
                "must not exceed RECONNECT_MAX_MS".to_string(),
            ));
        }
        Ok(())
    }


    #[must_use]
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    #[must_use]
    pub fn with_shard(mut self, id: u32, count: u32) -> Self {
        self.shard = ShardConfig { id, count };
        self
    }

    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    #[must_use]
    pub fn with_resume_window(mut self, window: Duration) -> Self {
        self.resume_window = window;
        self
    }

    #[must_use]
    pub fn with_dispatch_workers(mut self, workers: usize) -> Self {
        self.dispatch_workers = workers;
        self
    }

    #[must_use]
    pub fn with_large_threshold(mut self, threshold: u16) -> Self {
        self.large_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_message_cache(mut self, capacity: usize, max_age: Duration) -> Self {
        self.message_cache = MessageCacheConfig { capacity, max_age };
        self
    }
}

// The token never ends up in logs
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("gateway_url", &self.gateway_url)
            .field("gateway_version", &self.gateway_version)
            .field("intents", &self.intents)
            .field("shard", &self.shard)
            .field("reconnect", &self.reconnect)
            .field("resume_window", &self.resume_window)
            .field("dispatch_workers", &self.dispatch_workers)
            .field("large_threshold", &self.large_threshold)
            .field("message_cache", &self.message_cache)
            .field("env", &self.env)
            .field("log_frames", &self.log_frames)
            .finish()
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue(key, raw.clone()))
        })
        .transpose()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
