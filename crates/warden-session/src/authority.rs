//! The session authority: the only component that mutates session state.
//!
//! Responsible for:
//! - Creating one session per login, bound to a refresh-token family
//! - Validating presented refresh tokens and detecting reuse
//! - Rotating the refresh token bound to a session
//! - Keeping `last_seen` current on authenticated requests
//! - Revoking one, all, or all-but-one of a user's sessions
//! - Pruning stale ids out of the per-user session index
//!
//! # Concurrency note
//!
//! `SessionAuthority` holds no locks and no cached session state. Many
//! tasks call into one shared instance (behind `Arc`); every operation is a
//! handful of store round trips, and the only atomicity relied on is the
//! store's per-key and per-set atomicity. Writes to an existing record use
//! [`SessionStore::replace_ex`], so a session revoked between our read and
//! our write stays revoked.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use warden_store::{SessionStore, keys};

use crate::token::TokenHasher;
use crate::{
    DeviceContext, FamilyId, RefreshValidation, RejectReason,
    RevocationReason, Session, SessionConfig, SessionError, SessionId,
    SessionSummary, UserId, parse_user_agent,
};

/// Issues, rotates and revokes sessions on top of a [`SessionStore`].
///
/// ## Lifecycle
///
/// ```text
/// create_session() ──→ [Live] ──→ validate_and_rotate_refresh_token()
///                        │  ▲           │ match      │ mismatch
///                        │  └───────────┘            ▼
///                        │   rotate_refresh_token()  revoke_all_user_sessions()
///                        │                           │
///                        ▼                           ▼
///              revoke_session() / TTL          [Gone] (every session of the user)
///                        │
///                        ▼
///                     [Gone]
/// ```
pub struct SessionAuthority<S> {
    store: Arc<S>,
    config: SessionConfig,
    hasher: TokenHasher,
}

impl<S: SessionStore> SessionAuthority<S> {
    /// Creates an authority over `store`.
    pub fn new(store: Arc<S>, config: SessionConfig) -> Self {
        let hasher = TokenHasher::new(&config.refresh_secret);
        Self {
            store,
            config,
            hasher,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // -----------------------------------------------------------------
    // Creation and lookup
    // -----------------------------------------------------------------

    /// Creates a session for a user who just proved their credentials.
    ///
    /// Writes the record, adds it to the user's session index (refreshing
    /// the index TTL) and writes the refresh-family pointer, all with the
    /// configured lifetime. Concurrent logins of one user only share the
    /// index insert, which is additive.
    ///
    /// # Errors
    /// Any store failure is returned; the login must not proceed.
    pub async fn create_session(
        &self,
        user_id: UserId,
        email: &str,
        role: &str,
        refresh_token: &str,
        device: DeviceContext,
    ) -> Result<Session, SessionError> {
        let ttl = self.config.ttl;
        let now = Utc::now();

        let session = Session {
            session_id: SessionId::generate(),
            user_id,
            email: email.to_string(),
            role: role.to_string(),
            refresh_token_hash: self.hasher.hash(refresh_token),
            refresh_token_family: FamilyId::generate(),
            device_info: parse_user_agent(device.user_agent.as_deref()),
            ip: device.ip,
            user_agent: device.user_agent,
            created_at: now,
            last_seen: now,
            expires_at: expires_at(now, ttl),
        };

        let record = encode(&session)?;
        let index_key = keys::user_sessions(session.user_id.as_str());

        self.store
            .set_ex(&keys::session(session.session_id.as_str()), &record, ttl)
            .await?;
        self.store
            .set_add(&index_key, session.session_id.as_str())
            .await?;
        self.store.expire(&index_key, ttl).await?;
        self.store
            .set_ex(
                &keys::refresh_family(session.refresh_token_family.as_str()),
                session.session_id.as_str(),
                ttl,
            )
            .await?;

        tracing::info!(
            session_id = %session.session_id,
            user_id = %session.user_id,
            device = %session.device_info.name,
            "session created"
        );
        Ok(session)
    }

    /// Reads a session. Expired and unknown ids both yield `None`.
    pub async fn get_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Session>, SessionError> {
        let key = keys::session(session_id.as_str());
        match self.store.get(&key).await? {
            Some(raw) => decode(&key, &raw).map(Some),
            None => Ok(None),
        }
    }

    /// Sanitized view of one session, for "this device" displays.
    pub async fn get_current_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionSummary>, SessionError> {
        Ok(self
            .get_session(session_id)
            .await?
            .map(|session| session.summary()))
    }

    // -----------------------------------------------------------------
    // Refresh tokens
    // -----------------------------------------------------------------

    /// Checks a presented refresh token against the session's current hash.
    ///
    /// A mismatch means the token was valid once and has since been
    /// rotated away: someone is replaying an old token. Every session of
    /// the owning user is revoked before this returns.
    ///
    /// # Errors
    /// Store failures, including during the mass revocation. A caller
    /// seeing `Err` must not treat the token as valid.
    pub async fn validate_and_rotate_refresh_token(
        &self,
        presented_token: &str,
        session_id: &SessionId,
    ) -> Result<RefreshValidation, SessionError> {
        let Some(session) = self.get_session(session_id).await? else {
            tracing::debug!(%session_id, "refresh rejected: session not found");
            return Ok(RefreshValidation::Rejected(RejectReason::SessionNotFound));
        };

        if self
            .hasher
            .verify(presented_token, &session.refresh_token_hash)
        {
            return Ok(RefreshValidation::Valid(session));
        }

        tracing::warn!(
            %session_id,
            user_id = %session.user_id,
            family = %session.refresh_token_family,
            "refresh token reuse detected, revoking every session of the user"
        );
        let revoked = self
            .revoke_all_user_sessions(
                &session.user_id,
                RevocationReason::TokenTheftDetected,
            )
            .await?;
        tracing::warn!(user_id = %session.user_id, count = revoked, "sessions revoked after token reuse");

        Ok(RefreshValidation::Rejected(RejectReason::TokenReuseDetected))
    }

    /// Binds a new refresh token to the session and bumps `last_seen`.
    ///
    /// The remaining TTL is preserved: rotation never extends a session's
    /// life. Returns `false` if the session is gone, including when it is
    /// revoked between the read and the write.
    pub async fn rotate_refresh_token(
        &self,
        session_id: &SessionId,
        new_refresh_token: &str,
    ) -> Result<bool, SessionError> {
        let Some((mut session, remaining)) = self.load(session_id).await? else {
            return Ok(false);
        };

        session.refresh_token_hash = self.hasher.hash(new_refresh_token);
        session.last_seen = Utc::now();

        let written = self.write_back(&mut session, remaining).await?;
        if written {
            tracing::info!(%session_id, user_id = %session.user_id, "refresh token rotated");
        }
        Ok(written)
    }

    // -----------------------------------------------------------------
    // Activity
    // -----------------------------------------------------------------

    /// Records activity on a session. `false` if it no longer exists.
    pub async fn update_last_seen(
        &self,
        session_id: &SessionId,
    ) -> Result<bool, SessionError> {
        Ok(self.touch(session_id).await?.is_some())
    }

    /// Like [`update_last_seen`](Self::update_last_seen), but returns the
    /// refreshed record.
    ///
    /// One read (value and TTL together) and one conditional write. The
    /// user index is not touched.
    pub async fn touch(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Session>, SessionError> {
        let Some((mut session, remaining)) = self.load(session_id).await? else {
            return Ok(None);
        };

        session.last_seen = Utc::now();

        let written = self.write_back(&mut session, remaining).await?;
        Ok(written.then_some(session))
    }

    /// Lists a user's live sessions, most recently active first.
    ///
    /// Ids left in the index by expired sessions are skipped.
    pub async fn get_user_sessions(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SessionSummary>, SessionError> {
        let ids = self
            .store
            .set_members(&keys::user_sessions(user_id.as_str()))
            .await?;

        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(session) = self.get_session(&SessionId(id)).await? {
                sessions.push(session.summary());
            }
        }

        sessions.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(sessions)
    }

    // -----------------------------------------------------------------
    // Revocation
    // -----------------------------------------------------------------

    /// Revokes one session on behalf of `user_id`.
    ///
    /// Returns `false` if the session doesn't exist or belongs to someone
    /// else. The latter is logged: it's what probing for other users'
    /// session ids looks like.
    pub async fn revoke_session(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        reason: RevocationReason,
    ) -> Result<bool, SessionError> {
        let Some(session) = self.get_session(session_id).await? else {
            return Ok(false);
        };

        if &session.user_id != user_id {
            tracing::warn!(
                %session_id,
                requested_by = %user_id,
                owner = %session.user_id,
                "revoke rejected: session belongs to another user"
            );
            return Ok(false);
        }

        let deleted = self
            .store
            .delete(&keys::session(session_id.as_str()))
            .await?;
        self.store
            .set_remove(&keys::user_sessions(user_id.as_str()), session_id.as_str())
            .await?;
        self.store
            .delete(&keys::refresh_family(session.refresh_token_family.as_str()))
            .await?;

        if deleted {
            tracing::info!(%session_id, %user_id, reason = %reason, "session revoked");
        }
        Ok(deleted)
    }

    /// Revokes every session of a user and empties their index.
    ///
    /// Only the ids read at the start are removed from the index, so a
    /// login landing mid-revocation stays indexed (and revocable). The
    /// store drops the set once its last member is gone.
    ///
    /// Idempotent: once everything is gone, returns 0. Not atomic across
    /// sessions; each individual revocation is safe to retry.
    pub async fn revoke_all_user_sessions(
        &self,
        user_id: &UserId,
        reason: RevocationReason,
    ) -> Result<usize, SessionError> {
        let index_key = keys::user_sessions(user_id.as_str());
        let ids = self.store.set_members(&index_key).await?;

        let mut count = 0;
        for id in ids {
            if self.revoke_session(&SessionId(id.clone()), user_id, reason).await? {
                count += 1;
            } else {
                // Expired or foreign id: revoke_session left it in place.
                self.store.set_remove(&index_key, &id).await?;
            }
        }

        tracing::info!(%user_id, reason = %reason, count, "all user sessions revoked");
        Ok(count)
    }

    /// Revokes every session of a user except `keep`.
    ///
    /// The kept session and the index itself stay in place.
    pub async fn revoke_other_sessions(
        &self,
        user_id: &UserId,
        keep: &SessionId,
        reason: RevocationReason,
    ) -> Result<usize, SessionError> {
        let ids = self
            .store
            .set_members(&keys::user_sessions(user_id.as_str()))
            .await?;

        let mut count = 0;
        for id in ids.into_iter().filter(|id| id != keep.as_str()) {
            if self.revoke_session(&SessionId(id), user_id, reason).await? {
                count += 1;
            }
        }

        tracing::info!(%user_id, kept = %keep, reason = %reason, count, "other sessions revoked");
        Ok(count)
    }

    // -----------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------

    /// Removes ids of expired sessions from every user index.
    ///
    /// Readers already ignore such ids, so this only reclaims space.
    /// Returns the number of ids removed.
    pub async fn cleanup_expired_sessions(&self) -> Result<usize, SessionError> {
        let index_keys = self.store.scan_prefix(keys::USER_SESSIONS_PREFIX).await?;

        let mut pruned = 0;
        for index_key in &index_keys {
            for id in self.store.set_members(index_key).await? {
                if !self.store.exists(&keys::session(&id)).await?
                    && self.store.set_remove(index_key, &id).await?
                {
                    pruned += 1;
                }
            }
        }

        tracing::info!(indexes = index_keys.len(), pruned, "expired session cleanup finished");
        Ok(pruned)
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Reads a session together with its remaining TTL.
    async fn load(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<(Session, Option<Duration>)>, SessionError> {
        let key = keys::session(session_id.as_str());
        match self.store.get_with_ttl(&key).await? {
            Some(stored) => Ok(Some((decode(&key, &stored.value)?, stored.ttl))),
            None => Ok(None),
        }
    }

    /// Overwrites an existing record, keeping its remaining TTL.
    ///
    /// A key without a TTL gets the configured lifetime, and `expires_at`
    /// is moved to match. Returns `false` if the record is gone (or
    /// expiring this instant).
    async fn write_back(
        &self,
        session: &mut Session,
        remaining: Option<Duration>,
    ) -> Result<bool, SessionError> {
        let ttl = match remaining {
            Some(ttl) if ttl.is_zero() => return Ok(false),
            Some(ttl) => ttl,
            None => {
                session.expires_at = expires_at(Utc::now(), self.config.ttl);
                self.config.ttl
            }
        };

        let record = encode(session)?;
        Ok(self
            .store
            .replace_ex(&keys::session(session.session_id.as_str()), &record, ttl)
            .await?)
    }
}

fn encode(session: &Session) -> Result<String, SessionError> {
    serde_json::to_string(session).map_err(SessionError::Encode)
}

fn decode(key: &str, raw: &str) -> Result<Session, SessionError> {
    serde_json::from_str(raw).map_err(|source| SessionError::Decode {
        key: key.to_string(),
        source,
    })
}

/// `now + ttl`, saturating at the largest representable timestamp.
fn expires_at(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// =========================================================================
// Tests
// =========================================================================
