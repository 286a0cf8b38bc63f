//! Session module error types.

use std::fmt;

use thiserror::Error;

use auction_types::{OrgId, SessionStatus};

/// Errors raised by the ledger collaborator at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Read conflict on {key:?}: read version {read_version}, current version {current_version}")]
    ReadConflict {
        key: String,
        read_version: u64,
        current_version: u64,
    },

    #[error("Endorsement policy failure on {key:?}: missing endorsements from {missing:?}")]
    EndorsementPolicyFailure { key: String, missing: Vec<OrgId> },

    #[error("Corrupt record at {key:?}: {reason}")]
    CorruptRecord { key: String, reason: String },
}

/// Closed classification of [`SessionError`] for callers that branch on the
/// failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    PermissionDenied,
    InvalidState,
    HashMismatch,
    EmptyReveal,
    AlreadyExists,
    ValidationError,
    Ledger,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Errors that can occur in the session module.
///
/// Every error aborts the whole call; no state is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid state. Expected: {expected}, Got: {got}")]
    InvalidState {
        expected: SessionStatus,
        got: SessionStatus,
    },

    #[error("Hash mismatch for bid {bid_key}: {reason}")]
    HashMismatch { bid_key: String, reason: &'static str },

    #[error("No bids have been revealed in session {0}, nothing to settle")]
    EmptyReveal(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NotFound { .. } => ErrorKind::NotFound,
            SessionError::Unauthorized(_) => ErrorKind::Unauthorized,
            SessionError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            SessionError::InvalidState { .. } => ErrorKind::InvalidState,
            SessionError::HashMismatch { .. } => ErrorKind::HashMismatch,
            SessionError::EmptyReveal(_) => ErrorKind::EmptyReveal,
            SessionError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            SessionError::ValidationError(_) => ErrorKind::ValidationError,
            SessionError::Ledger(_) => ErrorKind::Ledger,
        }
    }

    pub(crate) fn session_not_found(id: &str) -> Self {
        SessionError::NotFound {
            what: "Session",
            id: id.to_string(),
        }
    }
}

impl From<auction_types::TypesError> for SessionError {
    fn from(e: auction_types::TypesError) -> Self {
        SessionError::ValidationError(e.to_string())
    }
}
