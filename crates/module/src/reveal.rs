//! Reveal verification.
//!
//! A reveal presents plaintext bytes that must open two digests: the one the
//! private store currently reports for the bid, and the one copied into the
//! session when the commitment was submitted. The second check catches a
//! private entry replaced after submission.

use auction_crypto::verify_opening;
use auction_types::{BidCommitment, BidDigest, BidKey, PlaintextBid};

use crate::error::SessionError;
use crate::handlers::HandlerResult;

/// Check `plaintext` against the live private hash, then the recorded one.
pub fn verify_digests(
    plaintext: &[u8],
    key: &BidKey,
    private_hash: &BidDigest,
    commitment: &BidCommitment,
) -> HandlerResult<BidDigest> {
    let digest = verify_opening(plaintext, private_hash).map_err(|_| SessionError::HashMismatch {
        bid_key: key.to_string(),
        reason: "content does not match the stored private bid",
    })?;
    verify_opening(plaintext, &commitment.hash).map_err(|_| SessionError::HashMismatch {
        bid_key: key.to_string(),
        reason: "content does not match the commitment recorded at submission",
    })?;
    Ok(digest)
}

/// Parse plaintext bid bytes, enforcing the configured volume bound.
pub fn parse_bid(plaintext: &[u8], max_bid_volume: Option<u64>) -> HandlerResult<PlaintextBid> {
    let bid = PlaintextBid::parse(plaintext)?;
    if let Some(max) = max_bid_volume {
        if bid.volume > max {
            return Err(SessionError::ValidationError(format!(
                "bid volume {} exceeds the maximum of {max}",
                bid.volume
            )));
        }
    }
    Ok(bid)
}

/// A bid may only be stored or revealed by its own author.
pub fn ensure_author(bid: &PlaintextBid, principal: &str) -> HandlerResult<()> {
    if bid.bidder != principal {
        return Err(SessionError::Unauthorized(format!(
            "bid belongs to {}, not {principal}",
            bid.bidder
        )));
    }
    Ok(())
}

/// The organization named in the bid must be the one that committed it.
pub fn ensure_organization(bid: &PlaintextBid, org: &str) -> HandlerResult<()> {
    if bid.org != org {
        return Err(SessionError::Unauthorized(format!(
            "bid names organization {}, expected {org}",
            bid.org
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use auction_crypto::bid_digest;

    const PLAINTEXT: &[u8] = br#"{"bidType":"sell","volume":50,"org":"Org1MSP","bidder":"alice"}"#;

    fn key() -> BidKey {
        BidKey::new("s1", "tx1").unwrap()
    }

    fn commitment(hash: BidDigest) -> BidCommitment {
        BidCommitment {
            org: "Org1MSP".into(),
            hash,
        }
    }

    #[test]
    fn test_matching_content_passes_both_checks() {
        let digest = bid_digest(PLAINTEXT);
        let verified = verify_digests(PLAINTEXT, &key(), &digest, &commitment(digest)).unwrap();
        assert_eq!(verified, digest);
    }

    #[test]
    fn test_tampered_volume_fails_first_check() {
        let digest = bid_digest(PLAINTEXT);
        let tampered = br#"{"bidType":"sell","volume":5,"org":"Org1MSP","bidder":"alice"}"#;
        let err = verify_digests(tampered, &key(), &digest, &commitment(digest)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::HashMismatch { reason: "content does not match the stored private bid", .. }
        ));
    }

    #[test]
    fn test_replaced_private_entry_fails_second_check() {
        // The private entry was swapped after the original digest was recorded.
        let recorded = bid_digest(b"original bytes");
        let live = bid_digest(PLAINTEXT);
        let err = verify_digests(PLAINTEXT, &key(), &live, &commitment(recorded)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::HashMismatch {
                reason: "content does not match the commitment recorded at submission",
                ..
            }
        ));
    }

    #[test]
    fn test_volume_bound() {
        assert!(parse_bid(PLAINTEXT, Some(50)).is_ok());
        let err = parse_bid(PLAINTEXT, Some(49)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_malformed_plaintext_is_validation_error() {
        let err = parse_bid(br#"{"bidType":"Sell","volume":1,"org":"o","bidder":"b"}"#, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_authorship() {
        let bid = parse_bid(PLAINTEXT, None).unwrap();
        assert!(ensure_author(&bid, "alice").is_ok());
        assert_eq!(ensure_author(&bid, "bob").unwrap_err().kind(), ErrorKind::Unauthorized);
        assert!(ensure_organization(&bid, "Org1MSP").is_ok());
        assert_eq!(
            ensure_organization(&bid, "Org2MSP").unwrap_err().kind(),
            ErrorKind::Unauthorized
        );
    }
}
