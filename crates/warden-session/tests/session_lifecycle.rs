//! Integration tests for the session lifecycle.
//!
//! Everything runs against `MemoryStore`. Its TTLs follow the Tokio clock,
//! so tests that need sessions to age call `tokio::time::pause()` and then
//! `advance()` through days of lifetime instantly.

use std::sync::Arc;
use std::time::Duration;

use warden_session::{
    DeviceContext, DeviceType, RefreshValidation, RejectReason,
    RevocationReason, Session, SessionAuthority, SessionConfig, SessionId,
    UserId, generate_refresh_token,
};
use warden_store::{MemoryStore, SessionStore, keys};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

const LAPTOP_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15";
const PHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1";

// =========================================================================
// Helpers
// =========================================================================

fn authority() -> SessionAuthority<MemoryStore> {
    SessionAuthority::new(
        Arc::new(MemoryStore::new()),
        SessionConfig::new("integration-secret"),
    )
}

fn alice() -> UserId {
    UserId::from("user-alice")
}

async fn login(
    authority: &SessionAuthority<MemoryStore>,
    user: &UserId,
    refresh_token: &str,
    user_agent: &str,
) -> Session {
    authority
        .create_session(
            user.clone(),
            "alice@example.com",
            "user",
            refresh_token,
            DeviceContext::new("203.0.113.7", user_agent),
        )
        .await
        .expect("login should succeed")
}

async fn remaining_ttl(
    authority: &SessionAuthority<MemoryStore>,
    session_id: &SessionId,
) -> Duration {
    authority
        .store()
        .get_with_ttl(&keys::session(session_id.as_str()))
        .await
        .unwrap()
        .expect("session should exist")
        .ttl
        .expect("session should carry a TTL")
}

// =========================================================================
// Round trip
// =========================================================================

#[tokio::test]
async fn test_create_then_get_returns_same_record() {
    let authority = authority();

    let created = login(&authority, &alice(), "rt-1", LAPTOP_UA).await;
    let fetched = authority
        .get_session(&created.session_id)
        .await
        .unwrap()
        .expect("session should exist");

    assert_eq!(fetched, created);
    assert_eq!(fetched.email, "alice@example.com");
    assert_eq!(fetched.role, "user");
}

#[tokio::test]
async fn test_get_current_session_strips_refresh_data() {
    let authority = authority();
    let created = login(&authority, &alice(), "rt-1", LAPTOP_UA).await;

    let summary = authority
        .get_current_session(&created.session_id)
        .await
        .unwrap()
        .expect("session should exist");

    let json = serde_json::to_value(&summary).unwrap();
    assert!(json.get("refresh_token_hash").is_none());
    assert!(json.get("refresh_token_family").is_none());
    assert_eq!(json["session_id"], created.session_id.as_str());
    assert_eq!(json["device_info"]["browser"], "Safari 17.2");
}

// =========================================================================
// Rotation and reuse detection
// =========================================================================

#[tokio::test]
async fn test_rotation_chain_accepts_only_latest_token() {
    let authority = authority();
    let first = generate_refresh_token();
    let session = login(&authority, &alice(), &first, LAPTOP_UA).await;

    let mut current = first;
    for _ in 0..3 {
        let verdict = authority
            .validate_and_rotate_refresh_token(&current, &session.session_id)
            .await
            .unwrap();
        assert!(verdict.is_valid());

        let next = generate_refresh_token();
        assert!(
            authority
                .rotate_refresh_token(&session.session_id, &next)
                .await
                .unwrap()
        );
        current = next;
    }

    let verdict = authority
        .validate_and_rotate_refresh_token(&current, &session.session_id)
        .await
        .unwrap();
    assert!(verdict.is_valid());
}

#[tokio::test]
async fn test_reused_token_revokes_every_session_of_the_user() {
    let authority = authority();
    let laptop = login(&authority, &alice(), "laptop-rt-1", LAPTOP_UA).await;
    let phone = login(&authority, &alice(), "phone-rt-1", PHONE_UA).await;
    let bob = login(&authority, &UserId::from("user-bob"), "bob-rt", LAPTOP_UA).await;

    // Legitimate client rotates; an attacker holding the old token replays it.
    authority
        .rotate_refresh_token(&laptop.session_id, "laptop-rt-2")
        .await
        .unwrap();
    let verdict = authority
        .validate_and_rotate_refresh_token("laptop-rt-1", &laptop.session_id)
        .await
        .unwrap();

    assert_eq!(
        verdict,
        RefreshValidation::Rejected(RejectReason::TokenReuseDetected)
    );
    assert!(verdict.security_alert());
    assert!(authority.get_session(&laptop.session_id).await.unwrap().is_none());
    assert!(authority.get_session(&phone.session_id).await.unwrap().is_none());
    assert!(authority.get_user_sessions(&alice()).await.unwrap().is_empty());

    // Other users are untouched.
    assert!(authority.get_session(&bob.session_id).await.unwrap().is_some());

    // The legitimate holder of the new token is locked out too.
    let verdict = authority
        .validate_and_rotate_refresh_token("laptop-rt-2", &laptop.session_id)
        .await
        .unwrap();
    assert_eq!(
        verdict,
        RefreshValidation::Rejected(RejectReason::SessionNotFound)
    );
}

#[tokio::test]
async fn test_reuse_after_revocation_reports_not_found() {
    let authority = authority();
    let session = login(&authority, &alice(), "rt-1", LAPTOP_UA).await;
    authority
        .revoke_session(&session.session_id, &alice(), RevocationReason::Logout)
        .await
        .unwrap();

    let verdict = authority
        .validate_and_rotate_refresh_token("rt-1", &session.session_id)
        .await
        .unwrap();

    assert_eq!(
        verdict.to_response(),
        RefreshValidation::Rejected(RejectReason::SessionNotFound).to_response()
    );
    assert!(!verdict.security_alert());
}

// =========================================================================
// TTL behavior
// =========================================================================

#[tokio::test]
async fn test_rotation_preserves_remaining_ttl() {
    tokio::time::pause();
    let authority = authority();
    let session = login(&authority, &alice(), "rt-1", LAPTOP_UA).await;

    tokio::time::advance(2 * DAY).await;
    let before = remaining_ttl(&authority, &session.session_id).await;
    assert!(
        authority
            .rotate_refresh_token(&session.session_id, "rt-2")
            .await
            .unwrap()
    );
    let after = remaining_ttl(&authority, &session.session_id).await;

    assert!(after <= before, "rotation must never extend a session");
    assert!(after > 4 * DAY);
}

#[tokio::test]
async fn test_touch_preserves_remaining_ttl() {
    tokio::time::pause();
    let authority = authority();
    let session = login(&authority, &alice(), "rt-1", LAPTOP_UA).await;

    tokio::time::advance(6 * DAY).await;
    assert!(authority.update_last_seen(&session.session_id).await.unwrap());
    tokio::time::advance(DAY).await;

    assert!(authority.get_session(&session.session_id).await.unwrap().is_none());
    assert!(!authority.update_last_seen(&session.session_id).await.unwrap());
}

#[tokio::test]
async fn test_session_expires_after_ttl() {
    tokio::time::pause();
    let authority = authority();
    let session = login(&authority, &alice(), "rt-1", LAPTOP_UA).await;

    tokio::time::advance(7 * DAY + Duration::from_secs(1)).await;

    assert!(authority.get_session(&session.session_id).await.unwrap().is_none());
    let verdict = authority
        .validate_and_rotate_refresh_token("rt-1", &session.session_id)
        .await
        .unwrap();
    assert_eq!(
        verdict,
        RefreshValidation::Rejected(RejectReason::SessionNotFound)
    );
}

#[tokio::test]
async fn test_custom_ttl_applies_to_new_sessions() {
    tokio::time::pause();
    let authority = SessionAuthority::new(
        Arc::new(MemoryStore::new()),
        SessionConfig::new("s").with_ttl(Duration::from_secs(60)),
    );
    let session = login(&authority, &alice(), "rt", LAPTOP_UA).await;

    tokio::time::advance(Duration::from_secs(61)).await;

    assert!(authority.get_session(&session.session_id).await.unwrap().is_none());
}

// =========================================================================
// Index hygiene and cleanup
// =========================================================================

#[tokio::test]
async fn test_expired_sessions_are_never_listed_and_cleanup_prunes_them() {
    tokio::time::pause();
    let authority = authority();
    let old = login(&authority, &alice(), "rt-old", LAPTOP_UA).await;

    // The second login refreshes the index TTL past the first session's.
    tokio::time::advance(3 * DAY).await;
    let fresh = login(&authority, &alice(), "rt-new", PHONE_UA).await;
    tokio::time::advance(5 * DAY).await;

    let index = authority
        .store()
        .set_members(&keys::user_sessions(alice().as_str()))
        .await
        .unwrap();
    assert_eq!(index.len(), 2, "stale id is still indexed before cleanup");

    let listed = authority.get_user_sessions(&alice()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].session_id, fresh.session_id);

    assert_eq!(authority.cleanup_expired_sessions().await.unwrap(), 1);
    assert_eq!(authority.cleanup_expired_sessions().await.unwrap(), 0);

    let index = authority
        .store()
        .set_members(&keys::user_sessions(alice().as_str()))
        .await
        .unwrap();
    assert_eq!(index, vec![fresh.session_id.to_string()]);
    assert!(!index.contains(&old.session_id.to_string()));
}

// =========================================================================
// Revocation
// =========================================================================

#[tokio::test]
async fn test_revoke_all_is_idempotent() {
    let authority = authority();
    login(&authority, &alice(), "rt-a", LAPTOP_UA).await;
    login(&authority, &alice(), "rt-b", PHONE_UA).await;

    let first = authority
        .revoke_all_user_sessions(&alice(), RevocationReason::UserRevokedAll)
        .await
        .unwrap();
    let second = authority
        .revoke_all_user_sessions(&alice(), RevocationReason::UserRevokedAll)
        .await
        .unwrap();

    assert_eq!(first, 2);
    assert_eq!(second, 0);
    assert!(authority.get_user_sessions(&alice()).await.unwrap().is_empty());
    assert!(authority.store().is_empty().await);
}

#[tokio::test]
async fn test_revoke_session_of_another_user_is_refused() {
    let authority = authority();
    let victim = login(&authority, &alice(), "rt-a", LAPTOP_UA).await;
    let mallory = UserId::from("user-mallory");

    let revoked = authority
        .revoke_session(&victim.session_id, &mallory, RevocationReason::UserRevoked)
        .await
        .unwrap();

    assert!(!revoked);
    assert!(authority.get_session(&victim.session_id).await.unwrap().is_some());
    assert_eq!(authority.get_user_sessions(&alice()).await.unwrap().len(), 1);
}

// =========================================================================
// Multi-device scenario
// =========================================================================

#[tokio::test]
async fn test_multi_device_listing_and_selective_revocation() {
    let authority = authority();
    let laptop = login(&authority, &alice(), "laptop-rt", LAPTOP_UA).await;
    let phone = login(&authority, &alice(), "phone-rt", PHONE_UA).await;

    // The laptop is used after the phone logged in, so it sorts first.
    assert!(authority.update_last_seen(&laptop.session_id).await.unwrap());

    let listed = authority.get_user_sessions(&alice()).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].session_id, laptop.session_id);
    assert_eq!(listed[1].session_id, phone.session_id);
    assert!(listed[0].is_current(&laptop.session_id));
    assert!(!listed[1].is_current(&laptop.session_id));
    assert_eq!(listed[1].device_info.device_type, DeviceType::Mobile);
    assert_eq!(listed[1].device_info.name, "iPhone");

    // From the laptop, sign the phone out.
    assert!(
        authority
            .revoke_session(&phone.session_id, &alice(), RevocationReason::UserRevoked)
            .await
            .unwrap()
    );

    let listed = authority.get_user_sessions(&alice()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].is_current(&laptop.session_id));

    let verdict = authority
        .validate_and_rotate_refresh_token("phone-rt", &phone.session_id)
        .await
        .unwrap();
    assert_eq!(
        verdict,
        RefreshValidation::Rejected(RejectReason::SessionNotFound)
    );
    let verdict = authority
        .validate_and_rotate_refresh_token("laptop-rt", &laptop.session_id)
        .await
        .unwrap();
    assert!(verdict.is_valid());
}

#[tokio::test]
async fn test_concurrent_logins_for_one_user_all_indexed() {
    let authority = Arc::new(authority());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let authority = Arc::clone(&authority);
            tokio::spawn(async move {
                authority
                    .create_session(
                        alice(),
                        "alice@example.com",
                        "user",
                        &format!("rt-{i}"),
                        DeviceContext::default(),
                    )
                    .await
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(authority.get_user_sessions(&alice()).await.unwrap().len(), 8);
}
