//! Error types for WatchVault
//!
//! Write paths surface these; read paths never do (absent values are `None`
//! or an empty collection, not an error).

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    /// No reachable store, or the store failed the operation outright
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A uniqueness or check constraint rejected the write
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Registration of a username that is already taken
    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Codec error: {0}")]
    Codec(String),

    // -------------------------------------------------------------------------
    // I/O and WAL Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Wrap any displayable backend failure as `BackendUnavailable`
    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        StoreError::BackendUnavailable(reason.to_string())
    }

    /// True when the failure means "the store could not be reached or used"
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::BackendUnavailable(_) | StoreError::Io(_))
    }
}
