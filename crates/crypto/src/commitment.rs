//! SHA-256 commitments over plaintext bid bytes.

use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use auction_types::BidDigest;

use crate::error::CryptoError;

/// Length of the blinding salt in bytes.
pub const SALT_LEN: usize = 32;

/// Digest of the exact plaintext bytes.
pub fn bid_digest(plaintext: &[u8]) -> BidDigest {
    BidDigest(Sha256::digest(plaintext).into())
}

/// Interpret raw digest bytes returned by a private-data store.
pub fn digest_from_slice(bytes: &[u8]) -> Result<BidDigest, CryptoError> {
    let array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidDigestLength(bytes.len()))?;
    Ok(BidDigest(array))
}

/// Check that `plaintext` opens `expected`.
///
/// Returns the computed digest on success so callers can compare it against
/// further recorded digests without hashing twice.
pub fn verify_opening(plaintext: &[u8], expected: &BidDigest) -> Result<BidDigest, CryptoError> {
    let computed = bid_digest(plaintext);
    if &computed == expected {
        Ok(computed)
    } else {
        Err(CryptoError::DigestMismatch {
            expected: *expected,
            computed,
        })
    }
}

/// Generate a random blinding salt.
pub fn generate_salt<R: RngCore + CryptoRng>(rng: &mut R) -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);
    salt
}

/// Generate a random blinding salt, hex encoded for embedding in JSON.
pub fn salt_hex<R: RngCore + CryptoRng>(rng: &mut R) -> String {
    hex::encode(generate_salt(rng))
}
