//! `Warden` builder and lifecycle.
//!
//! Ties the layers together: store → session authority → gate, plus the
//! background janitor. Everything owned here is released by
//! [`Warden::shutdown`].

use std::sync::Arc;
use std::time::Duration;

use warden_gate::{AccessTokenVerifier, AuthenticationGate};
use warden_session::SessionAuthority;
use warden_store::{RedisStore, SessionStore};

use crate::{Janitor, WardenConfig, WardenError};

/// Builder for configuring and starting Warden.
///
/// # Example
///
/// ```rust,ignore
/// use warden::prelude::*;
///
/// let warden = WardenBuilder::from_config(WardenConfig::from_env()?)
///     .connect(my_verifier)
///     .await?;
/// ```
pub struct WardenBuilder {
    config: WardenConfig,
}

impl WardenBuilder {
    /// Creates a builder with default settings and no refresh secret.
    pub fn new() -> Self {
        Self {
            config: WardenConfig::default(),
        }
    }

    /// Starts from a loaded config, e.g. [`WardenConfig::from_env`].
    pub fn from_config(config: WardenConfig) -> Self {
        Self { config }
    }

    /// Sets the server secret keying the refresh-token HMAC.
    pub fn refresh_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.session.refresh_secret = secret.into();
        self
    }

    /// Sets the lifetime of new sessions.
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.config.session.ttl = ttl;
        self
    }

    /// Sets the Redis connection URL.
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.store.url = url.into();
        self
    }

    /// Sets how often the janitor prunes stale index entries.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.config.cleanup_interval = interval;
        self
    }

    /// Sets the upper bound on the janitor's random start delay.
    pub fn cleanup_jitter(mut self, jitter: Duration) -> Self {
        self.config.cleanup_jitter = jitter;
        self
    }

    /// Builds Warden on top of an existing store.
    ///
    /// Must be called within a Tokio runtime: the janitor is spawned here.
    pub async fn build_with_store<S, V>(
        self,
        store: Arc<S>,
        verifier: V,
    ) -> Result<Warden<S, V>, WardenError>
    where
        S: SessionStore,
        V: AccessTokenVerifier,
    {
        self.config.validate()?;

        let authority = Arc::new(SessionAuthority::new(store, self.config.session));
        let gate = AuthenticationGate::new(Arc::clone(&authority), verifier);
        let janitor = Janitor::spawn(
            Arc::clone(&authority),
            self.config.cleanup_interval,
            self.config.cleanup_jitter,
        );

        tracing::info!(
            session_ttl = ?authority.config().ttl,
            cleanup_interval = ?self.config.cleanup_interval,
            "warden started"
        );
        Ok(Warden {
            authority,
            gate,
            janitor,
        })
    }

    /// Connects to Redis and builds Warden on top of it.
    pub async fn connect<V: AccessTokenVerifier>(
        self,
        verifier: V,
    ) -> Result<Warden<RedisStore, V>, WardenError> {
        self.config.validate()?;
        let store = RedisStore::connect(&self.config.store).await?;
        self.build_with_store(Arc::new(store), verifier).await
    }
}

impl Default for WardenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Warden instance.
pub struct Warden<S, V> {
    authority: Arc<SessionAuthority<S>>,
    gate: AuthenticationGate<S, V>,
    janitor: Janitor,
}

impl<S, V> Warden<S, V>
where
    S: SessionStore,
    V: AccessTokenVerifier,
{
    /// Session operations: login, refresh, listing, revocation.
    pub fn authority(&self) -> &Arc<SessionAuthority<S>> {
        &self.authority
    }

    /// Per-request authentication.
    pub fn gate(&self) -> &AuthenticationGate<S, V> {
        &self.gate
    }

    /// Stops the janitor and releases the store's connections.
    pub async fn shutdown(self) {
        self.janitor.shutdown().await;
        self.authority.store().close();
        tracing::info!("warden stopped");
    }
}
