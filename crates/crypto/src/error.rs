//! Error types for commitment operations.

use thiserror::Error;

use auction_types::BidDigest;

/// Errors that can occur while checking commitments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Digest mismatch: expected {expected}, computed {computed}")]
    DigestMismatch {
        expected: BidDigest,
        computed: BidDigest,
    },

    #[error("Invalid digest length: expected 32 bytes, got {0}")]
    InvalidDigestLength(usize),
}
