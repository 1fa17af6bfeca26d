//! Error types for the gate layer.

/// Why a request was turned away.
///
/// `Unauthenticated` deliberately carries no detail: a client can't tell a
/// revoked session from an expired token from a store outage. The precise
/// cause is logged at `debug` level instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// No usable credentials, or the session behind them is gone.
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated, but the role isn't allowed to do this.
    #[error("you do not have permission to perform this action")]
    Forbidden,

    /// Returned by an [`AccessTokenVerifier`](crate::AccessTokenVerifier)
    /// for a token it won't accept. The gate folds this into
    /// [`GateError::Unauthenticated`] before it reaches a client.
    #[error("invalid access token: {0}")]
    InvalidToken(String),
}

impl GateError {
    /// HTTP status for the rejection: 401 or 403.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated | Self::InvalidToken(_) => 401,
            Self::Forbidden => 403,
        }
    }
}
