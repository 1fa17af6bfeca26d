//! Redis-backed [`SessionStore`] using a `deadpool-redis` connection pool.
//!
//! Each call checks a connection out of the pool for the duration of one
//! command (or one pipeline) and returns it immediately. Every call is
//! bounded by the configured command timeout; a timeout surfaces as
//! [`StoreError::Timeout`], whose outcome is unknown.

use std::future::Future;
use std::time::Duration;

use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use redis::{AsyncCommands, RedisResult};

use crate::{SessionStore, StoreError, StoredValue};

/// Connection settings for [`RedisStore`].
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// `redis://[:password@]host:port/db`
    pub url: String,

    /// Maximum pooled connections.
    pub pool_size: usize,

    /// Upper bound on a single store round trip, pool checkout included.
    pub command_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            pool_size: 16,
            command_timeout: Duration::from_secs(2),
        }
    }
}

/// Page size hint for `SCAN`.
const SCAN_COUNT: usize = 100;

/// A [`SessionStore`] backed by Redis.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
    timeout: Duration,
}

impl RedisStore {
    /// Builds the connection pool and verifies the server answers `PING`.
    ///
    /// Connections are opened lazily by the pool; the ping forces one so
    /// a misconfigured URL fails at startup rather than on first login.
    pub async fn connect(config: &RedisStoreConfig) -> Result<Self, StoreError> {
        let mut pool_config = Config::from_url(config.url.clone());
        pool_config.pool = Some(PoolConfig::new(config.pool_size));
        let pool = pool_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Pool(e.to_string()))?;

        let store = Self {
            pool,
            timeout: config.command_timeout,
        };

        let mut conn = store.conn().await?;
        let _: String = store
            .bounded("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;

        tracing::info!(pool_size = config.pool_size, "redis session store connected");
        Ok(store)
    }

    /// Wraps an existing pool (e.g. one shared with other subsystems).
    pub fn from_pool(pool: Pool, command_timeout: Duration) -> Self {
        Self {
            pool,
            timeout: command_timeout,
        }
    }

    async fn conn(&self) -> Result<Connection, StoreError> {
        match tokio::time::timeout(self.timeout, self.pool.get()).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(StoreError::Pool(e.to_string())),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }

    /// Runs one command under the client timeout and maps its error.
    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = RedisResult<T>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::Command(format!("{op}: {e}"))),
            Err(_) => {
                tracing::warn!(op, timeout = ?self.timeout, "redis command timed out");
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}

/// Redis rejects a zero expiry, so sub-millisecond TTLs round up.
fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

impl SessionStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn().await?;
        self.bounded("GET", conn.get(key)).await
    }

    async fn get_with_ttl(
        &self,
        key: &str,
    ) -> Result<Option<StoredValue>, StoreError> {
        let mut conn = self.conn().await?;
        let (value, pttl): (Option<String>, i64) = self
            .bounded(
                "GET+PTTL",
                redis::pipe()
                    .atomic()
                    .get(key)
                    .pttl(key)
                    .query_async(&mut conn),
            )
            .await?;

        // PTTL: -1 → no expiry, -2 → missing (raced with expiry/delete).
        Ok(value.map(|value| StoredValue {
            value,
            ttl: u64::try_from(pttl).ok().map(Duration::from_millis),
        }))
    }

    async fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: () = self
            .bounded(
                "SET PX",
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("PX")
                    .arg(millis(ttl))
                    .query_async(&mut conn),
            )
            .await?;
        Ok(())
    }

    async fn replace_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let reply: Option<String> = self
            .bounded(
                "SET PX XX",
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("PX")
                    .arg(millis(ttl))
                    .arg("XX")
                    .query_async(&mut conn),
            )
            .await?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let removed: i64 = self.bounded("DEL", conn.del(key)).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        self.bounded("EXISTS", conn.exists(key)).await
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: i64 = self.bounded("SADD", conn.sadd(key, member)).await?;
        Ok(())
    }

    async fn set_remove(
        &self,
        key: &str,
        member: &str,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let removed: i64 = self.bounded("SREM", conn.srem(key, member)).await?;
        Ok(removed > 0)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn().await?;
        self.bounded("SMEMBERS", conn.smembers(key)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let ms = i64::try_from(millis(ttl)).unwrap_or(i64::MAX);
        self.bounded("PEXPIRE", conn.pexpire(key, ms)).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn().await?;
        let pattern = format!("{prefix}*");
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, page): (u64, Vec<String>) = self
                .bounded(
                    "SCAN",
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_COUNT)
                        .query_async(&mut conn),
                )
                .await?;
            keys.extend(page);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        // SCAN may return a key more than once across pages.
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn close(&self) {
        tracing::info!("closing redis session store pool");
        self.pool.close();
    }
}
