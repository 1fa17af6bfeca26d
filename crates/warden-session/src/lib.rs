//! Session lifecycle management for Warden.
//!
//! This crate owns every server-side session record:
//!
//! 1. **Creation** — one session per logged-in device ([`SessionAuthority::create_session`])
//! 2. **Rotation** — replacing the refresh token bound to a session while
//!    keeping the session alive
//! 3. **Reuse detection** — a superseded refresh token presented again
//!    revokes every session the user has
//! 4. **Revocation** — single session, all sessions, or all but the current
//! 5. **Device fingerprinting** — a display-friendly [`DeviceInfo`] per session
//!
//! # How it fits in the stack
//!
//! ```text
//! Gate Layer (above)     ← checks session liveness on every request
//!     ↕
//! Session Layer (this crate)  ← rotation, theft detection, revocation
//!     ↕
//! Store Layer (below)    ← TTL'd keys and sets (Redis in production)
//! ```

mod authority;
mod device;
mod error;
mod session;
mod token;

pub use authority::SessionAuthority;
pub use device::{DeviceInfo, DeviceType, parse_user_agent};
pub use error::SessionError;
pub use session::{
    DEFAULT_SESSION_TTL, DeviceContext, FamilyId, RefreshResponse,
    RefreshValidation, RejectReason, RevocationReason, Session,
    SessionConfig, SessionId, SessionSummary, UserId,
};
pub use token::generate_refresh_token;
