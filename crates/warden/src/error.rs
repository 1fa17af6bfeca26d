//! Unified error type for Warden.

use warden_gate::GateError;
use warden_session::SessionError;
use warden_store::StoreError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `warden` meta-crate, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]` attribute
/// on each variant generates the `From` impls, so `?` converts sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    /// The session store failed (pool, command, timeout).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A session-layer error (store failure, corrupt record).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A request was rejected by the gate.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// Missing or malformed configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl WardenError {
    /// `true` if the failed operation may or may not have been applied.
    pub fn is_indeterminate(&self) -> bool {
        match self {
            Self::Store(e) => e.is_indeterminate(),
            Self::Session(e) => e.is_indeterminate(),
            Self::Gate(_) | Self::Config(_) => false,
        }
    }
}
