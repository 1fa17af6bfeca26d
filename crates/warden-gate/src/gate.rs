//! The authentication gate.
//!
//! A valid signature on an access token isn't enough: the session the token
//! was minted for must still exist. Revoking a session therefore locks out
//! every access token issued for it immediately, without waiting for those
//! tokens to expire.

use std::fmt;
use std::sync::Arc;

use warden_session::{SessionAuthority, SessionError, SessionId, UserId};
use warden_store::SessionStore;

use crate::{AccessClaims, AccessTokenVerifier, GateError};

/// The identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
    pub email: String,
    pub role: String,
    pub session_id: SessionId,
}

impl AuthContext {
    /// Allows the request only if the caller's role is one of `roles`.
    pub fn require_role(&self, roles: &[&str]) -> Result<(), GateError> {
        if roles.contains(&self.role.as_str()) {
            return Ok(());
        }
        tracing::warn!(
            user_id = %self.user_id,
            role = %self.role,
            allowed = ?roles,
            "role not permitted"
        );
        Err(GateError::Forbidden)
    }
}

/// The precise reason a request was rejected. Logged, never returned.
enum Rejection {
    MissingHeader,
    MalformedHeader,
    InvalidToken(GateError),
    MissingSessionClaim,
    SessionGone,
    UserMismatch,
    Store(SessionError),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHeader => f.write_str("missing authorization header"),
            Self::MalformedHeader => f.write_str("authorization header is not a bearer token"),
            Self::InvalidToken(e) => write!(f, "{e}"),
            Self::MissingSessionClaim => f.write_str("access token carries no session id"),
            Self::SessionGone => f.write_str("session revoked or expired"),
            Self::UserMismatch => f.write_str("session belongs to another user"),
            Self::Store(e) => write!(f, "session lookup failed: {e}"),
        }
    }
}

/// Checks every request's access token and the liveness of its session.
pub struct AuthenticationGate<S, V> {
    authority: Arc<SessionAuthority<S>>,
    verifier: V,
}

impl<S: SessionStore, V: AccessTokenVerifier> AuthenticationGate<S, V> {
    pub fn new(authority: Arc<SessionAuthority<S>>, verifier: V) -> Self {
        Self {
            authority,
            verifier,
        }
    }

    pub fn authority(&self) -> &Arc<SessionAuthority<S>> {
        &self.authority
    }

    /// Authenticates a request from its `Authorization` header value.
    ///
    /// On success the session's `last_seen` has been bumped. Every
    /// failure is the same [`GateError::Unauthenticated`].
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<AuthContext, GateError> {
        self.resolve(authorization).await.map_err(|rejection| {
            tracing::debug!(cause = %rejection, "request rejected");
            GateError::Unauthenticated
        })
    }

    /// Like [`authenticate`](Self::authenticate), but never rejects.
    ///
    /// Returns `None` when the request carries no credentials or when
    /// they don't check out.
    pub async fn authenticate_optional(
        &self,
        authorization: Option<&str>,
    ) -> Option<AuthContext> {
        if authorization.is_none() {
            return None;
        }
        self.authenticate(authorization).await.ok()
    }

    async fn resolve(
        &self,
        authorization: Option<&str>,
    ) -> Result<AuthContext, Rejection> {
        let header = authorization.ok_or(Rejection::MissingHeader)?;
        let token = bearer_token(header).ok_or(Rejection::MalformedHeader)?;

        let AccessClaims {
            user_id,
            email,
            role,
            session_id,
        } = self
            .verifier
            .verify(token)
            .await
            .map_err(Rejection::InvalidToken)?;
        let session_id = session_id.ok_or(Rejection::MissingSessionClaim)?;

        let session = self
            .authority
            .get_session(&session_id)
            .await
            .map_err(Rejection::Store)?
            .ok_or(Rejection::SessionGone)?;

        // Ownership first: a rejected request must leave the record untouched.
        if session.user_id != user_id {
            tracing::warn!(
                %session_id,
                token_user = %user_id,
                owner = %session.user_id,
                "access token presented for another user's session"
            );
            return Err(Rejection::UserMismatch);
        }

        self.authority
            .touch(&session_id)
            .await
            .map_err(Rejection::Store)?
            .ok_or(Rejection::SessionGone)?;

        Ok(AuthContext {
            user_id,
            email,
            role,
            session_id,
        })
    }
}

/// `"Bearer <token>"` → `<token>`. An empty token counts as missing.
fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(role: &str) -> AuthContext {
        AuthContext {
            user_id: UserId::from("u1"),
            email: "u1@example.com".into(),
            role: role.into(),
            session_id: SessionId::from("s1"),
        }
    }

    #[test]
    fn test_bearer_token_extracts_token() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("bearer abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token(""), None);
    }

    #[test]
    fn test_require_role_allowed_returns_ok() {
        assert_eq!(context("admin").require_role(&["admin", "moderator"]), Ok(()));
    }

    #[test]
    fn test_require_role_not_listed_returns_forbidden() {
        let result = context("user").require_role(&["admin"]);
        assert_eq!(result, Err(GateError::Forbidden));
        assert_eq!(result.unwrap_err().status_code(), 403);
    }

    #[test]
    fn test_require_role_empty_list_returns_forbidden() {
        assert_eq!(context("admin").require_role(&[]), Err(GateError::Forbidden));
    }
}
