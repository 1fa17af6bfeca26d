//! Session types: the records and results the session layer hands out.
//!
//! A "session" is the server's record of one logged-in device. It tracks:
//! - WHO the user is (identity snapshot taken at login)
//! - WHICH refresh token is currently valid (as an HMAC, never raw)
//! - WHERE the session came from (device, IP, user agent)
//! - WHEN it was created, last used, and will expire

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DeviceInfo;

/// Default session lifetime: 7 days.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque session identifier (a UUID v4 string). Embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

/// Identifier of the user that owns a session, as issued by the
/// credential-validation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Identifier of a refresh-token family: every rotation descending from
/// one login shares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyId(pub String);

macro_rules! string_id {
    ($ty:ident) => {
        impl $ty {
            /// Borrows the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(SessionId);
string_id!(UserId);
string_id!(FamilyId);

impl SessionId {
    pub(crate) fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl FamilyId {
    pub(crate) fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for the session authority.
#[derive(Clone)]
pub struct SessionConfig {
    /// Lifetime of a new session. Also applied to the user's session index
    /// and the refresh-family pointer on creation.
    pub ttl: Duration,

    /// Server secret keying the refresh-token HMAC.
    pub refresh_secret: String,
}

impl SessionConfig {
    /// Creates a config with the default 7-day lifetime.
    pub fn new(refresh_secret: impl Into<String>) -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
            refresh_secret: refresh_secret.into(),
        }
    }

    /// Overrides the session lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("ttl", &self.ttl)
            .field("refresh_secret", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// DeviceContext
// ---------------------------------------------------------------------------

/// Request details captured at login.
#[derive(Debug, Clone, Default)]
pub struct DeviceContext {
    /// Client IP address as seen by the HTTP layer.
    pub ip: Option<String>,

    /// Raw `User-Agent` header.
    pub user_agent: Option<String>,
}

impl DeviceContext {
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: Some(ip.into()),
            user_agent: Some(user_agent.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One authenticated device/browser instance for one user.
///
/// This is the full record as persisted under `session:<id>`. It carries
/// the refresh-token hash and family and must not leave the session layer's
/// trust boundary; listing endpoints get a [`SessionSummary`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub email: String,
    pub role: String,

    /// Hex HMAC-SHA256 of the one refresh token currently valid.
    pub refresh_token_hash: String,

    /// Stable across rotations.
    pub refresh_token_family: FamilyId,

    pub device_info: DeviceInfo,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,

    /// Advisory. The store TTL is what actually expires the record.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Strips the refresh-token hash and family.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
            device_info: self.device_info.clone(),
            ip: self.ip.clone(),
            user_agent: self.user_agent.clone(),
            created_at: self.created_at,
            last_seen: self.last_seen,
            expires_at: self.expires_at,
        }
    }
}

/// A session as shown to its owner: everything except refresh-token data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub email: String,
    pub role: String,
    pub device_info: DeviceInfo,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionSummary {
    /// Returns `true` if this is the session the request came in on.
    pub fn is_current(&self, current: &SessionId) -> bool {
        &self.session_id == current
    }
}

// ---------------------------------------------------------------------------
// RevocationReason
// ---------------------------------------------------------------------------

/// Why a session was revoked. Logged with every revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationReason {
    /// The owner revoked one session from their device list.
    UserRevoked,
    /// The owner signed out everywhere.
    UserRevokedAll,
    /// A superseded refresh token was presented.
    TokenTheftDetected,
    /// Normal logout of the current session.
    Logout,
    /// Maintenance removed a session that had outlived its purpose.
    Expired,
}

impl RevocationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserRevoked => "user_revoked",
            Self::UserRevokedAll => "user_revoked_all",
            Self::TokenTheftDetected => "token_theft_detected",
            Self::Logout => "logout",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Refresh validation
// ---------------------------------------------------------------------------

/// Why a refresh token was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The session is gone: revoked, expired, or never existed.
    SessionNotFound,
    /// The token was valid once but has been rotated away. Every session
    /// of the user has already been revoked by the time this is returned.
    TokenReuseDetected,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "session_not_found",
            Self::TokenReuseDetected => "token_reuse_detected",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of presenting a refresh token.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshValidation {
    /// The token is the current one. The caller issues a new refresh
    /// token and calls [`rotate_refresh_token`](crate::SessionAuthority::rotate_refresh_token).
    Valid(Session),

    /// The token was rejected; the caller must force a full re-login.
    Rejected(RejectReason),
}

impl RefreshValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// `true` only for reuse detection, which has revoked every session.
    pub fn security_alert(&self) -> bool {
        matches!(self, Self::Rejected(RejectReason::TokenReuseDetected))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Valid(session) => Some(session),
            Self::Rejected(_) => None,
        }
    }

    /// The `{valid, reason, security_alert}` shape returned to the
    /// refresh endpoint. Never includes the session record.
    pub fn to_response(&self) -> RefreshResponse {
        match self {
            Self::Valid(_) => RefreshResponse {
                valid: true,
                reason: None,
                security_alert: false,
            },
            Self::Rejected(reason) => RefreshResponse {
                valid: false,
                reason: Some(reason.as_str()),
                security_alert: self.security_alert(),
            },
        }
    }
}

/// Serializable verdict for the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub security_alert: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_transparently() {
        let id = SessionId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        assert_eq!(id.to_string(), "abc");
    }

    #[test]
    fn test_generated_ids_are_unique_uuids() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(a.as_str()).is_ok());
        assert!(uuid::Uuid::parse_str(FamilyId::generate().as_str()).is_ok());
    }

    #[test]
    fn test_session_config_defaults_to_seven_days() {
        let config = SessionConfig::new("secret");
        assert_eq!(config.ttl, Duration::from_secs(604_800));
    }

    #[test]
    fn test_session_config_debug_redacts_secret() {
        let config = SessionConfig::new("hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn test_revocation_reason_strings() {
        assert_eq!(RevocationReason::UserRevoked.to_string(), "user_revoked");
        assert_eq!(
            RevocationReason::TokenTheftDetected.to_string(),
            "token_theft_detected"
        );
    }

    #[test]
    fn test_rejected_reuse_response_raises_security_alert() {
        let verdict = RefreshValidation::Rejected(RejectReason::TokenReuseDetected);

        let response = verdict.to_response();

        assert!(!response.valid);
        assert_eq!(response.reason, Some("token_reuse_detected"));
        assert!(response.security_alert);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({
                "valid": false,
                "reason": "token_reuse_detected",
                "security_alert": true
            })
        );
    }

    #[test]
    fn test_rejected_not_found_response_has_no_alert() {
        let verdict = RefreshValidation::Rejected(RejectReason::SessionNotFound);

        let response = verdict.to_response();

        assert!(!verdict.is_valid());
        assert!(!response.security_alert);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({ "valid": false, "reason": "session_not_found" })
        );
    }
}
