//! Error types for the session layer.

use warden_store::StoreError;

/// Errors that can occur during session management.
///
/// Absence is never an error here: a missing or expired session is a normal
/// outcome and comes back as `Ok(None)` / `Ok(false)`. These variants cover
/// the store failing or a record that can't be (de)serialized.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session store failed. If the underlying error is a timeout the
    /// operation may have been partially applied; see
    /// [`SessionError::is_indeterminate`].
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A session record couldn't be serialized for storage.
    #[error("failed to encode session record: {0}")]
    Encode(#[source] serde_json::Error),

    /// A stored session record couldn't be parsed.
    #[error("corrupt session record {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SessionError {
    /// Returns `true` when the outcome of the failed call is unknown.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_indeterminate())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_from_store_error() {
        let err: SessionError = StoreError::Pool("down".into()).into();
        assert!(matches!(err, SessionError::Store(_)));
        assert!(err.to_string().contains("down"));
    }

    #[test]
    fn test_timeout_is_indeterminate() {
        let err: SessionError = StoreError::Timeout(Duration::from_secs(1)).into();
        assert!(err.is_indeterminate());

        let err: SessionError = StoreError::Command("ERR".into()).into();
        assert!(!err.is_indeterminate());
    }
}
