//! Hash commitments for sealed bids.
//!
//! A bidder commits to a bid by storing its plaintext in their organization's
//! private partition; only the SHA-256 digest of those exact bytes becomes
//! public. Revealing means presenting bytes that hash to the same digest.
//!
//! # Overview
//!
//! 1. **Commit**: the private store records the plaintext and exposes
//!    `digest = SHA-256(plaintext)`.
//!
//! 2. **Bind**: the digest is copied into the public session record at
//!    submission time.
//!
//! 3. **Open**: on reveal the caller supplies the plaintext again; it must hash
//!    to the live private digest and to the digest recorded at submission.
//!
//! A random salt inside the plaintext keeps low-entropy bids (a small integer
//! volume and a side) from being recovered by hashing every candidate.

pub mod commitment;
pub mod error;

pub use commitment::{
    bid_digest, digest_from_slice, generate_salt, salt_hex, verify_opening, SALT_LEN,
};
pub use error::CryptoError;
