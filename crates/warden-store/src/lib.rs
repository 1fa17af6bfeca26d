//! Session store abstraction for Warden.
//!
//! Provides the [`SessionStore`] trait: the small set of TTL-aware
//! key-value and set operations the session layer needs, modeled on
//! what a networked store like Redis offers natively.
//!
//! # Key families
//!
//! ```text
//! session:<session_id>         → JSON session record (TTL)
//! user_sessions:<user_id>      → set of session ids   (TTL)
//! refresh_family:<family_id>   → session id           (TTL)
//! ```
//!
//! Every single-key and single-set operation is atomic on the store side.
//! That is the only coordination primitive the session layer relies on;
//! there is no in-process locking above this crate.
//!
//! # Feature Flags
//!
//! - `redis` (default) — [`RedisStore`] backed by a `deadpool-redis` pool

#![allow(async_fn_in_trait)]

mod error;
pub mod keys;
mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::{RedisStore, RedisStoreConfig};

use std::future::Future;
use std::time::Duration;

/// A string value read together with its remaining time-to-live.
///
/// `ttl` is `None` when the key exists but has no expiry set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    pub value: String,
    pub ttl: Option<Duration>,
}

/// A networked, TTL-capable key-value store holding session state.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → one store is shared (behind `Arc`) by every
///   request-handling task and by the background janitor.
/// - Every returned future is `Send` so callers can hold it across
///   `tokio::spawn` boundaries.
///
/// Missing keys are never errors: reads return `None`/empty and
/// conditional writes return `false`. `Err` is reserved for the store
/// itself failing (no connection, command rejected, timeout).
pub trait SessionStore: Send + Sync + 'static {
    /// Reads a string value.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Reads a string value and its remaining TTL in one round trip.
    fn get_with_ttl(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<StoredValue>, StoreError>> + Send;

    /// Writes a string value with a TTL, creating or overwriting the key.
    fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrites a string value with a TTL, but only if the key still
    /// exists. Returns `false` (and writes nothing) when it doesn't.
    fn replace_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Deletes a key of any type. Returns `true` if something was deleted.
    fn delete(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Returns `true` if the key exists and has not expired.
    fn exists(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Adds a member to the set at `key`, creating the set if needed.
    fn set_add(
        &self,
        key: &str,
        member: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes a member from the set. Returns `true` if it was present.
    fn set_remove(
        &self,
        key: &str,
        member: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Returns every member of the set (empty if the key is missing).
    fn set_members(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Sets a TTL on an existing key. Returns `false` if the key is missing.
    fn expire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Lists every live key starting with `prefix`.
    fn scan_prefix(
        &self,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Releases any pooled connections. Called once on shutdown.
    fn close(&self) {}
}
