//! Request authentication for Warden.
//!
//! Sits in front of every protected handler. A request passes only if:
//!
//! 1. It carries `Authorization: Bearer <token>`
//! 2. The token passes the pluggable [`AccessTokenVerifier`]
//! 3. The token names a session, and that session still exists
//!
//! Passing requests get an [`AuthContext`] and touch their session's
//! `last_seen`. Everything else gets the same [`GateError::Unauthenticated`].
//! [`AuthContext::require_role`] covers role checks after authentication.

#![allow(async_fn_in_trait)]

mod error;
mod gate;
mod verifier;

pub use error::GateError;
pub use gate::{AuthContext, AuthenticationGate};
pub use verifier::{AccessClaims, AccessTokenVerifier};
