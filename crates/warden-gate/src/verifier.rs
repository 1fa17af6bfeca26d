//! Access-token verification hook.
//!
//! Warden doesn't define what an access token looks like. Signed JWTs,
//! PASETO, opaque tokens looked up elsewhere: that's the caller's choice.
//! The gate only needs the claims, so it takes an [`AccessTokenVerifier`]
//! and calls it once per request before checking session liveness.

use std::future::Future;

use warden_session::{SessionId, UserId};

use crate::GateError;

/// Claims carried by a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    pub user_id: UserId,
    pub email: String,
    pub role: String,

    /// The session the token was minted for. Tokens without one are
    /// rejected by the gate: they can't be revoked.
    pub session_id: Option<SessionId>,
}

/// Validates an access token's integrity and expiry and returns its claims.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → one verifier is shared by every request task
///   for the lifetime of the gate.
///
/// # Example
///
/// ```rust
/// use warden_gate::{AccessClaims, AccessTokenVerifier, GateError};
/// use warden_session::{SessionId, UserId};
///
/// /// Accepts `"<user>:<session>"`. Only for development!
/// struct PlainVerifier;
///
/// impl AccessTokenVerifier for PlainVerifier {
///     async fn verify(&self, token: &str) -> Result<AccessClaims, GateError> {
///         let (user, session) = token
///             .split_once(':')
///             .ok_or_else(|| GateError::InvalidToken("expected user:session".into()))?;
///         Ok(AccessClaims {
///             user_id: UserId::from(user),
///             email: format!("{user}@example.com"),
///             role: "user".into(),
///             session_id: Some(SessionId::from(session)),
///         })
///     }
/// }
/// ```
pub trait AccessTokenVerifier: Send + Sync + 'static {
    /// Returns the token's claims, or [`GateError::InvalidToken`] if the
    /// token is malformed, tampered with or expired.
    fn verify(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<AccessClaims, GateError>> + Send;
}
