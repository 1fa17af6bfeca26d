//! # Warden
//!
//! Multi-device session and refresh-token lifecycle manager.
//!
//! Warden tracks one server-side session per logged-in device, rotates the
//! refresh token bound to each session, and treats a replayed (already
//! rotated) refresh token as theft: every session of that user is revoked
//! on the spot. Access tokens stay short-lived and stateless, but each
//! request also checks that its session is still alive, so revocation takes
//! effect immediately.
//!
//! ## Layers
//!
//! ```text
//! warden-gate     ← per-request: bearer token + session liveness
//! warden-session  ← create, rotate, detect reuse, revoke, list
//! warden-store    ← TTL'd keys and sets (Redis, or in-memory for tests)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use warden::prelude::*;
//!
//! // Implement AccessTokenVerifier for your token format, then:
//! // let warden = WardenBuilder::new()
//! //     .refresh_secret("...")
//! //     .connect(my_verifier)
//! //     .await?;
//! // let session = warden.authority().create_session(...).await?;
//! ```

mod config;
mod error;
mod janitor;
mod service;

pub use config::{
    ConfigError, DEFAULT_CLEANUP_INTERVAL, DEFAULT_CLEANUP_JITTER, WardenConfig,
};
pub use error::WardenError;
pub use janitor::Janitor;
pub use service::{Warden, WardenBuilder};

pub use warden_gate as gate;
pub use warden_session as session;
pub use warden_store as store;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set, so it's safe to
/// call from tests and binaries alike.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

pub mod prelude {
    //! Everything a typical integration needs.

    pub use crate::{Warden, WardenBuilder, WardenConfig, WardenError, init_tracing};
    pub use warden_gate::{
        AccessClaims, AccessTokenVerifier, AuthContext, AuthenticationGate, GateError,
    };
    pub use warden_session::{
        DeviceContext, DeviceInfo, RefreshResponse, RefreshValidation, RejectReason,
        RevocationReason, Session, SessionAuthority, SessionConfig, SessionId,
        SessionSummary, UserId, generate_refresh_token,
    };
    pub use warden_store::{MemoryStore, RedisStore, SessionStore};
}
