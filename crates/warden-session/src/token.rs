//! Refresh-token hashing and generation.
//!
//! Raw refresh tokens never reach the store. Sessions hold
//! `hex(HMAC-SHA256(refresh_secret, token))`; a presented token is checked
//! by recomputing the MAC and comparing in constant time.

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC keyed once with the server's refresh secret.
#[derive(Clone)]
pub(crate) struct TokenHasher {
    mac: HmacSha256,
}

impl TokenHasher {
    pub(crate) fn new(secret: &str) -> Self {
        Self {
            mac: HmacSha256::new_from_slice(secret.as_bytes())
                .expect("HMAC accepts any key length"),
        }
    }

    /// Lowercase hex digest of `token`.
    pub(crate) fn hash(&self, token: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Returns `true` if `token` hashes to `stored_hash`.
    ///
    /// A stored hash that isn't valid hex never matches.
    pub(crate) fn verify(&self, token: &str, stored_hash: &str) -> bool {
        let Ok(expected) = hex::decode(stored_hash) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

/// Generates an opaque refresh token: 32 random bytes (256 bits) as 64
/// lowercase hex characters.
pub fn generate_refresh_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}
