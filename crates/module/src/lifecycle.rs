//! Session lifecycle transitions.
//!
//! Each transition takes the current session snapshot by reference and
//! returns a new snapshot. Handlers decide which transition applies; the
//! functions here only enforce the record-level rules.

use auction_types::clearing_io::BidOutcome;
use auction_types::{BidCommitment, BidKey, RevealedBid, Session, SessionStatus};

use crate::error::SessionError;
use crate::handlers::HandlerResult;

/// Only the session creator may administer it.
pub fn ensure_admin(session: &Session, principal: &str) -> HandlerResult<()> {
    if session.admin != principal {
        return Err(SessionError::Unauthorized(format!(
            "{principal} is not the admin of session {}",
            session.id
        )));
    }
    Ok(())
}

pub fn ensure_status(session: &Session, expected: SessionStatus) -> HandlerResult<()> {
    if session.status != expected {
        return Err(SessionError::InvalidState {
            expected,
            got: session.status,
        });
    }
    Ok(())
}

/// Result of admitting a commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub session: Session,
    /// Set when the committer's organization joined the session
    pub new_organization: Option<String>,
}

/// Record a commitment under `key`. Commitments are immutable once admitted.
pub fn admit_commitment(
    session: &Session,
    key: BidKey,
    commitment: BidCommitment,
) -> HandlerResult<Admission> {
    ensure_status(session, SessionStatus::Open)?;
    if session.private_bids.contains_key(&key) {
        return Err(SessionError::AlreadyExists(format!(
            "commitment for bid {key}"
        )));
    }

    let mut next = session.clone();
    let new_organization = if next.has_organization(&commitment.org) {
        None
    } else {
        next.organizations.push(commitment.org.clone());
        Some(commitment.org.clone())
    };
    next.private_bids.insert(key, commitment);

    Ok(Admission {
        session: next,
        new_organization,
    })
}

fn advance(session: &Session, from: SessionStatus) -> HandlerResult<Session> {
    ensure_status(session, from)?;
    let mut next = session.clone();
    // from always has a successor here: Ended is never passed in.
    next.status = from.successor().unwrap_or(from);
    Ok(next)
}

/// Open -> Closed.
pub fn close(session: &Session) -> HandlerResult<Session> {
    advance(session, SessionStatus::Open)
}

/// Record a verified reveal. The bid must have a commitment and must not
/// have been revealed before.
pub fn record_reveal(session: &Session, key: BidKey, bid: RevealedBid) -> HandlerResult<Session> {
    ensure_status(session, SessionStatus::Closed)?;
    if session.commitment(&key).is_none() {
        return Err(SessionError::NotFound {
            what: "Commitment",
            id: key.to_string(),
        });
    }
    if session.revealed(&key).is_some() {
        return Err(SessionError::AlreadyExists(format!("reveal for bid {key}")));
    }

    let mut next = session.clone();
    next.revealed_bids.insert(key, bid);
    Ok(next)
}

/// Write one settlement label. Only `Finalized` bids may be labelled.
pub fn apply_outcome(session: &Session, outcome: &BidOutcome) -> HandlerResult<Session> {
    ensure_status(session, SessionStatus::Closed)?;
    let mut next = session.clone();
    let bid = next
        .revealed_bids
        .get_mut(&outcome.bid_key)
        .ok_or_else(|| SessionError::NotFound {
            what: "Revealed bid",
            id: outcome.bid_key.to_string(),
        })?;
    if bid.status.is_settled() {
        return Err(SessionError::ValidationError(format!(
            "bid {} already settled as {:?}",
            outcome.bid_key, bid.status
        )));
    }
    bid.status = outcome.status;
    Ok(next)
}

/// Closed -> Ended.
pub fn end(session: &Session) -> HandlerResult<Session> {
    advance(session, SessionStatus::Closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_types::{BidDigest, BidSide, SettlementStatus};

    fn key(submission: &str) -> BidKey {
        BidKey::new("s1", submission).unwrap()
    }

    fn commitment(org: &str) -> BidCommitment {
        BidCommitment {
            org: org.into(),
            hash: BidDigest([9u8; 32]),
        }
    }

    fn revealed(side: BidSide, volume: u64) -> RevealedBid {
        RevealedBid {
            bid_type: side,
            volume,
            org: "Org1MSP".into(),
            bidder: "alice".into(),
            status: SettlementStatus::Finalized,
        }
    }

    fn open_session() -> Session {
        Session::open("s1".into(), "admin".into(), "Org1MSP".into())
    }

    #[test]
    fn test_admit_tracks_new_organizations() {
        let session = open_session();
        let first = admit_commitment(&session, key("a"), commitment("Org1MSP")).unwrap();
        assert_eq!(first.new_organization, None);

        let second = admit_commitment(&first.session, key("b"), commitment("Org2MSP")).unwrap();
        assert_eq!(second.new_organization.as_deref(), Some("Org2MSP"));
        assert_eq!(second.session.organizations, vec!["Org1MSP", "Org2MSP"]);

        // The input snapshot is untouched.
        assert!(session.private_bids.is_empty());
    }

    #[test]
    fn test_commitment_is_immutable() {
        let session = open_session();
        let admitted = admit_commitment(&session, key("a"), commitment("Org1MSP")).unwrap();
        let err = admit_commitment(&admitted.session, key("a"), commitment("Org2MSP")).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyExists(_)));
    }

    #[test]
    fn test_status_never_regresses() {
        let closed = close(&open_session()).unwrap();
        assert_eq!(closed.status, SessionStatus::Closed);
        assert!(matches!(
            close(&closed),
            Err(SessionError::InvalidState { expected: SessionStatus::Open, got: SessionStatus::Closed })
        ));

        let ended = end(&closed).unwrap();
        assert_eq!(ended.status, SessionStatus::Ended);
        assert!(end(&ended).is_err());
        assert!(close(&ended).is_err());
        assert!(end(&open_session()).is_err());
    }

    #[test]
    fn test_reveal_requires_commitment_and_is_single() {
        let admitted = admit_commitment(&open_session(), key("a"), commitment("Org1MSP")).unwrap();
        let closed = close(&admitted.session).unwrap();

        let err = record_reveal(&closed, key("zz"), revealed(BidSide::Buy, 5)).unwrap_err();
        assert!(matches!(err, SessionError::NotFound { what: "Commitment", .. }));

        let once = record_reveal(&closed, key("a"), revealed(BidSide::Buy, 5)).unwrap();
        let err = record_reveal(&once, key("a"), revealed(BidSide::Buy, 5)).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyExists(_)));
    }

    #[test]
    fn test_outcome_assigned_once() {
        let admitted = admit_commitment(&open_session(), key("a"), commitment("Org1MSP")).unwrap();
        let closed = close(&admitted.session).unwrap();
        let revealed = record_reveal(&closed, key("a"), revealed(BidSide::Sell, 5)).unwrap();

        let outcome = BidOutcome {
            bid_key: key("a"),
            side: BidSide::Sell,
            volume: 5,
            status: SettlementStatus::NotApproved,
            matched: 0,
        };
        let settled = apply_outcome(&revealed, &outcome).unwrap();
        assert_eq!(
            settled.revealed(&key("a")).map(|b| b.status),
            Some(SettlementStatus::NotApproved)
        );
        assert!(apply_outcome(&settled, &outcome).is_err());
    }

    #[test]
    fn test_only_admin_administers() {
        let session = open_session();
        assert!(ensure_admin(&session, "admin").is_ok());
        assert!(matches!(
            ensure_admin(&session, "mallory"),
            Err(SessionError::Unauthorized(_))
        ));
    }
}
