use std::time::Duration;

/// Errors that can occur talking to the session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No connection could be obtained (pool exhausted, store down).
    #[error("store unavailable: {0}")]
    Pool(String),

    /// The store rejected or failed a command.
    #[error("store command failed: {0}")]
    Command(String),

    /// The command did not complete within the client timeout.
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    /// Returns `true` when the outcome of the call is unknown.
    ///
    /// A timed-out write may still have been applied server-side, so
    /// callers must not treat it as a clean "nothing happened" failure.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
