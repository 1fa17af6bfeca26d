//! Runtime configuration, read from the environment.
//!
//! # Environment variables
//!
//! | Variable                        | Default                  |
//! |---------------------------------|--------------------------|
//! | `JWT_REFRESH_SECRET`            | required                 |
//! | `REDIS_URL`                     | built from the four below |
//! | `REDIS_HOST`                    | `localhost`              |
//! | `REDIS_PORT`                    | `6379`                   |
//! | `REDIS_PASSWORD`                | none                     |
//! | `REDIS_DB`                      | `0`                      |
//! | `REDIS_POOL_SIZE`               | `16`                     |
//! | `REDIS_TIMEOUT_MS`              | `2000`                   |
//! | `SESSION_TTL_SECS`              | `604800` (7 days)        |
//! | `SESSION_CLEANUP_INTERVAL_SECS` | `3600`                   |
//!
//! Empty values count as unset.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use warden_session::SessionConfig;
use warden_store::RedisStoreConfig;

/// Default period of the expired-session janitor.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default upper bound on the janitor's random start delay.
pub const DEFAULT_CLEANUP_JITTER: Duration = Duration::from_secs(30);

/// Configuration problems found at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Everything needed to stand up a [`Warden`](crate::Warden).
#[derive(Debug, Clone)]
pub struct WardenConfig {
    pub store: RedisStoreConfig,
    pub session: SessionConfig,

    /// How often stale ids are pruned from the user session indexes.
    pub cleanup_interval: Duration,

    /// The janitor's first run is delayed by a random amount up to this,
    /// so replicas started together don't scan in lockstep.
    pub cleanup_jitter: Duration,
}

impl Default for WardenConfig {
    /// Defaults for everything except the refresh secret, which is left
    /// empty and must be set before building.
    fn default() -> Self {
        Self {
            store: RedisStoreConfig::default(),
            session: SessionConfig::new(String::new()),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            cleanup_jitter: DEFAULT_CLEANUP_JITTER,
        }
    }
}

impl WardenConfig {
    /// Loads `.env` (if present) and reads the process environment.
    ///
    /// # Errors
    /// [`ConfigError::Missing`] without `JWT_REFRESH_SECRET`,
    /// [`ConfigError::Invalid`] for values that don't parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "no .env file loaded");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        config.session.refresh_secret =
            var("JWT_REFRESH_SECRET").ok_or(ConfigError::Missing("JWT_REFRESH_SECRET"))?;

        config.store.url = match var("REDIS_URL") {
            Some(url) => url,
            None => {
                let host = var("REDIS_HOST").unwrap_or_else(|| "localhost".to_string());
                let port: u16 = parse(&var, "REDIS_PORT")?.unwrap_or(6379);
                let db: u32 = parse(&var, "REDIS_DB")?.unwrap_or(0);
                match var("REDIS_PASSWORD") {
                    Some(password) => format!("redis://:{password}@{host}:{port}/{db}"),
                    None => format!("redis://{host}:{port}/{db}"),
                }
            }
        };

        if let Some(size) = positive(&var, "REDIS_POOL_SIZE")? {
            config.store.pool_size = size;
        }
        if let Some(ms) = positive(&var, "REDIS_TIMEOUT_MS")? {
            config.store.command_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = positive(&var, "SESSION_TTL_SECS")? {
            config.session.ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = positive(&var, "SESSION_CLEANUP_INTERVAL_SECS")? {
            config.cleanup_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Checks the values a builder may have set by hand.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.refresh_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_REFRESH_SECRET"));
        }
        if self.session.ttl.is_zero() {
            return Err(ConfigError::Invalid {
                key: "SESSION_TTL_SECS",
                reason: "must be greater than zero".into(),
            });
        }
        if self.cleanup_interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "SESSION_CLEANUP_INTERVAL_SECS",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

fn parse<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    var(key)
        .map(|raw| {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn positive<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr + Default + PartialEq,
    T::Err: Display,
{
    match parse::<T>(var, key)? {
        Some(value) if value == T::default() => Err(ConfigError::Invalid {
            key,
            reason: "must be greater than zero".into(),
        }),
        other => Ok(other),
    }
}
