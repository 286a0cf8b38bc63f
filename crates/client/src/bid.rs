//! Bid preparation.

use rand::{CryptoRng, RngCore};
use thiserror::Error;

use auction_crypto::{bid_digest, salt_hex};
use auction_types::{BidDigest, BidSide, OrgId, PlaintextBid, PrincipalId, TypesError};

/// Errors that can occur during bid creation.
#[derive(Debug, Error)]
pub enum BidError {
    #[error("Bid volume {volume} exceeds maximum {max}")]
    BidTooLarge { volume: u64, max: u64 },

    #[error("Encoding failed: {0}")]
    Encoding(#[from] TypesError),
}

/// A prepared bid ready for submission.
#[derive(Debug, Clone)]
pub struct PreparedBid {
    /// Exact bytes to store privately and later reveal (keep secret)
    pub plaintext: Vec<u8>,
    /// Digest the session will record at submission
    pub digest: BidDigest,
    /// Parsed form of `plaintext`
    pub bid: PlaintextBid,
}

/// Create a salted plaintext bid.
pub fn create_bid<R: RngCore + CryptoRng>(
    side: BidSide,
    volume: u64,
    org: &str,
    bidder: &str,
    rng: &mut R,
) -> Result<PreparedBid, BidError> {
    BidBuilder::new(side, org, bidder).volume(volume).build(rng)
}

/// Builder for creating bids with additional options.
pub struct BidBuilder {
    side: BidSide,
    volume: u64,
    org: OrgId,
    bidder: PrincipalId,
    salted: bool,
    max_volume: Option<u64>,
}

impl BidBuilder {
    /// Create a new bid builder.
    pub fn new(side: BidSide, org: impl Into<OrgId>, bidder: impl Into<PrincipalId>) -> Self {
        Self {
            side,
            volume: 0,
            org: org.into(),
            bidder: bidder.into(),
            salted: true,
            max_volume: None,
        }
    }

    /// Set the bid volume.
    pub fn volume(mut self, volume: u64) -> Self {
        self.volume = volume;
        self
    }

    /// Omit the blinding salt. The digest of an unsalted bid can be guessed
    /// by hashing candidate volumes.
    pub fn unsalted(mut self) -> Self {
        self.salted = false;
        self
    }

    /// Reject volumes above `max` before anything is submitted.
    pub fn max_volume(mut self, max: Option<u64>) -> Self {
        self.max_volume = max;
        self
    }

    /// Build the prepared bid.
    pub fn build<R: RngCore + CryptoRng>(self, rng: &mut R) -> Result<PreparedBid, BidError> {
        if let Some(max) = self.max_volume {
            if self.volume > max {
                return Err(BidError::BidTooLarge {
                    volume: self.volume,
                    max,
                });
            }
        }

        let bid = PlaintextBid {
            bid_type: self.side,
            volume: self.volume,
            org: self.org,
            bidder: self.bidder,
            salt: self.salted.then(|| salt_hex(rng)),
        };
        let plaintext = bid.to_bytes()?;
        let digest = bid_digest(&plaintext);

        Ok(PreparedBid {
            plaintext,
            digest,
            bid,
        })
    }
}
