//! Walks one user through a multi-device session lifecycle in memory:
//! two logins, a refresh rotation, a replayed refresh token, and the mass
//! revocation it triggers.
//!
//! Run with `RUST_LOG=debug cargo run -p multi-device` to see the gate's
//! rejection causes.

use std::sync::Arc;

use warden::prelude::*;

const LAPTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const PHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 \
    (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1";

// ---------------------------------------------------------------------------
// Access tokens
// ---------------------------------------------------------------------------

/// Stand-in for a JWT verifier: tokens are `"<user>|<role>|<session>"`.
struct DemoVerifier;

impl AccessTokenVerifier for DemoVerifier {
    async fn verify(&self, token: &str) -> Result<AccessClaims, GateError> {
        let mut parts = token.splitn(3, '|');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(user), Some(role), Some(session)) => Ok(AccessClaims {
                user_id: UserId::from(user),
                email: format!("{user}@example.com"),
                role: role.to_string(),
                session_id: Some(SessionId::from(session)),
            }),
            _ => Err(GateError::InvalidToken("expected user|role|session".into())),
        }
    }
}

fn access_header(user: &UserId, session: &Session) -> String {
    format!("Bearer {user}|{}|{}", session.role, session.session_id)
}

fn print_sessions(title: &str, sessions: &[SessionSummary], current: &SessionId) {
    println!("\n{title}");
    for s in sessions {
        let marker = if s.is_current(current) { "*" } else { " " };
        println!(
            " {marker} {}  {} / {} / {}  last seen {}",
            s.session_id,
            s.device_info.name,
            s.device_info.os,
            s.device_info.browser,
            s.last_seen.format("%H:%M:%S%.3f"),
        );
    }
    if sessions.is_empty() {
        println!("   (none)");
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), WardenError> {
    init_tracing();

    let warden = WardenBuilder::new()
        .refresh_secret("demo-refresh-secret")
        .build_with_store(Arc::new(MemoryStore::new()), DemoVerifier)
        .await?;
    let authority = warden.authority();
    let alice = UserId::from("alice");

    // Two logins, two independent sessions.
    let laptop_rt = generate_refresh_token();
    let laptop = authority
        .create_session(
            alice.clone(),
            "alice@example.com",
            "user",
            &laptop_rt,
            DeviceContext::new("203.0.113.10", LAPTOP_UA),
        )
        .await?;
    let phone_rt = generate_refresh_token();
    let phone = authority
        .create_session(
            alice.clone(),
            "alice@example.com",
            "user",
            &phone_rt,
            DeviceContext::new("198.51.100.22", PHONE_UA),
        )
        .await?;

    // A request from the laptop passes the gate and bumps its last_seen.
    let ctx = warden
        .gate()
        .authenticate(Some(&access_header(&alice, &laptop)))
        .await?;
    tracing::info!(user_id = %ctx.user_id, session_id = %ctx.session_id, "laptop request authenticated");

    let sessions = authority.get_user_sessions(&alice).await?;
    print_sessions("Alice's sessions (viewed from the laptop):", &sessions, &laptop.session_id);

    // The laptop refreshes: validate, then rotate.
    let verdict = authority
        .validate_and_rotate_refresh_token(&laptop_rt, &laptop.session_id)
        .await?;
    println!("\nlaptop refresh: {}", serde_json::json!(verdict.to_response()));
    let laptop_rt_2 = generate_refresh_token();
    authority
        .rotate_refresh_token(&laptop.session_id, &laptop_rt_2)
        .await?;

    // Someone replays the laptop's old refresh token.
    let verdict = authority
        .validate_and_rotate_refresh_token(&laptop_rt, &laptop.session_id)
        .await?;
    println!("replayed refresh: {}", serde_json::json!(verdict.to_response()));

    let sessions = authority.get_user_sessions(&alice).await?;
    print_sessions("Alice's sessions after reuse detection:", &sessions, &laptop.session_id);

    // Neither device's access token works any more.
    for (name, session) in [("laptop", &laptop), ("phone", &phone)] {
        let result = warden
            .gate()
            .authenticate(Some(&access_header(&alice, session)))
            .await;
        match result {
            Ok(_) => println!("{name}: still authenticated"),
            Err(e) => println!("{name}: {} ({e})", e.status_code()),
        }
    }

    warden.shutdown().await;
    Ok(())
}
