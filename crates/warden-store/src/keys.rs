//! Key naming for the three session key families.

pub const SESSION_PREFIX: &str = "session:";
pub const USER_SESSIONS_PREFIX: &str = "user_sessions:";
pub const REFRESH_FAMILY_PREFIX: &str = "refresh_family:";

/// `session:<session_id>`
pub fn session(session_id: &str) -> String {
    format!("{SESSION_PREFIX}{session_id}")
}

/// `user_sessions:<user_id>`
pub fn user_sessions(user_id: &str) -> String {
    format!("{USER_SESSIONS_PREFIX}{user_id}")
}

/// `refresh_family:<family_id>`
pub fn refresh_family(family_id: &str) -> String {
    format!("{REFRESH_FAMILY_PREFIX}{family_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_families_use_expected_prefixes() {
        assert_eq!(session("abc"), "session:abc");
        assert_eq!(user_sessions("u1"), "user_sessions:u1");
        assert_eq!(refresh_family("f9"), "refresh_family:f9");
    }
}
