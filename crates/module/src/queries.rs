//! Query handlers for the session module.
//!
//! These functions provide read-only access to session state. They read
//! committed state directly and never produce a write set.

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use auction_types::{
    BidKey, BidSide, PlaintextBid, PrincipalId, Session, SessionStatus, SettlementStatus,
};

use crate::context::CallContext;
use crate::error::{LedgerError, SessionError};
use crate::handlers::{HandlerResult, SessionModule};
use crate::ledger::Ledger;

/// Query request types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionQuery {
    /// Public session record.
    QuerySession { session_id: String },

    /// The caller's own private bid.
    QueryBid {
        session_id: String,
        submission_id: String,
    },

    /// The caller's principal id.
    GetId,

    /// Per-side settlement totals.
    SettlementSummary { session_id: String },
}

/// Query response types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionQueryResponse {
    Session(Session),
    Bid(PrivateBid),
    Id(PrincipalId),
    Summary(SettlementSummary),
}

/// Handle a query.
pub fn handle_query<L: Ledger + ?Sized>(
    module: &SessionModule,
    ledger: &L,
    ctx: &CallContext,
    query: &SessionQuery,
) -> HandlerResult<SessionQueryResponse> {
    match query {
        SessionQuery::QuerySession { session_id } => {
            query_session(module, ledger, session_id).map(SessionQueryResponse::Session)
        }
        SessionQuery::QueryBid {
            session_id,
            submission_id,
        } => query_bid(module, ledger, ctx, session_id, submission_id).map(SessionQueryResponse::Bid),
        SessionQuery::GetId => Ok(SessionQueryResponse::Id(get_id(ctx))),
        SessionQuery::SettlementSummary { session_id } => {
            let session = query_session(module, ledger, session_id)?;
            Ok(SessionQueryResponse::Summary(SettlementSummary::from_session(
                &session,
            )))
        }
    }
}

/// Get a session by id.
pub fn query_session<L: Ledger + ?Sized>(
    module: &SessionModule,
    ledger: &L,
    session_id: &str,
) -> HandlerResult<Session> {
    let key = module.asset_key(session_id)?;
    let bytes = ledger
        .get_state(&key)?
        .ok_or_else(|| SessionError::session_not_found(session_id))?;
    let session = Session::from_bytes(&bytes).map_err(|e| LedgerError::CorruptRecord {
        key,
        reason: e.to_string(),
    })?;
    Ok(session)
}

/// A private bid as stored, with its parsed form.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateBid {
    /// `session/submission`
    pub bid_key: String,
    /// Exact stored bytes; a reveal must present these unchanged
    #[serde_as(as = "Hex")]
    pub plaintext: Vec<u8>,
    pub bid: PlaintextBid,
}

/// Get the caller's own private bid.
pub fn query_bid<L: Ledger + ?Sized>(
    module: &SessionModule,
    ledger: &L,
    ctx: &CallContext,
    session_id: &str,
    submission_id: &str,
) -> HandlerResult<PrivateBid> {
    ctx.verify_client_org_matches_peer()?;

    let key = BidKey::new(session_id, submission_id)?;
    let collection = module.config().collection_for(&ctx.organization);
    let plaintext = ledger
        .get_private(&collection, &key.composite())?
        .ok_or_else(|| SessionError::NotFound {
            what: "Private bid",
            id: key.to_string(),
        })?;

    let bid = PlaintextBid::parse(&plaintext)?;
    if bid.bidder != ctx.principal {
        return Err(SessionError::Unauthorized(format!(
            "{} is not the owner of bid {key}",
            ctx.principal
        )));
    }

    Ok(PrivateBid {
        bid_key: key.to_string(),
        plaintext,
        bid,
    })
}

/// The calling principal.
pub fn get_id(ctx: &CallContext) -> PrincipalId {
    ctx.principal.clone()
}

/// Totals and label counts for one bid side.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideSummary {
    pub bids: usize,
    pub volume: u128,
    pub approved: usize,
    pub partially_approved: usize,
    pub not_approved: usize,
    pub pending: usize,
}

impl SideSummary {
    fn record(&mut self, volume: u64, status: SettlementStatus) {
        self.bids += 1;
        self.volume += u128::from(volume);
        match status {
            SettlementStatus::Finalized => self.pending += 1,
            SettlementStatus::Approved => self.approved += 1,
            SettlementStatus::PartiallyApproved => self.partially_approved += 1,
            SettlementStatus::NotApproved => self.not_approved += 1,
        }
    }
}

/// Settlement overview derived from the public session record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub session_id: String,
    pub status: SessionStatus,
    pub organizations: usize,
    pub commitments: usize,
    pub buy: SideSummary,
    pub sell: SideSummary,
}

impl SettlementSummary {
    pub fn from_session(session: &Session) -> Self {
        let mut buy = SideSummary::default();
        let mut sell = SideSummary::default();
        for bid in session.revealed_bids.values() {
            match bid.bid_type {
                BidSide::Buy => buy.record(bid.volume, bid.status),
                BidSide::Sell => sell.record(bid.volume, bid.status),
            }
        }
        Self {
            session_id: session.id.clone(),
            status: session.status,
            organizations: session.organizations.len(),
            commitments: session.private_bids.len(),
            buy,
            sell,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::SessionCall;
    use crate::error::ErrorKind;
    use crate::genesis::ModuleGenesisConfig;
    use crate::state::MemoryLedger;
    use auction_types::{AssetKind, RevealedBid};

    const PLAINTEXT: &[u8] = br#"{"bidType":"buy","volume":12,"org":"Org2MSP","bidder":"bob"}"#;

    fn setup_with_bid() -> (SessionModule, MemoryLedger) {
        let module =
            SessionModule::new(AssetKind::Transaction, ModuleGenesisConfig::default()).unwrap();
        let mut ledger = MemoryLedger::new();
        let ctx = CallContext::new("admin", "Org1MSP", "tx0");
        module
            .execute(&mut ledger, &ctx, &SessionCall::CreateSession { session_id: "s1".into() })
            .unwrap();
        let ctx = CallContext::new("bob", "Org2MSP", "tx1").with_transient("bid", PLAINTEXT.to_vec());
        module
            .execute(&mut ledger, &ctx, &SessionCall::CommitBid { session_id: "s1".into() })
            .unwrap();
        (module, ledger)
    }

    #[test]
    fn test_query_session() {
        let (module, ledger) = setup_with_bid();
        let ctx = CallContext::new("anyone", "Org3MSP", "q");
        let response = handle_query(
            &module,
            &ledger,
            &ctx,
            &SessionQuery::QuerySession { session_id: "s1".into() },
        )
        .unwrap();
        assert!(matches!(response, SessionQueryResponse::Session(s) if s.admin == "admin"));

        let err = query_session(&module, &ledger, "missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_query_own_bid() {
        let (module, ledger) = setup_with_bid();
        let ctx = CallContext::new("bob", "Org2MSP", "q");
        let bid = query_bid(&module, &ledger, &ctx, "s1", "tx1").unwrap();
        assert_eq!(bid.plaintext, PLAINTEXT);
        assert_eq!(bid.bid.volume, 12);
        assert_eq!(bid.bid_key, "s1/tx1");
    }

    #[test]
    fn test_query_bid_access_control() {
        let (module, ledger) = setup_with_bid();

        let foreign_peer = CallContext::new("bob", "Org2MSP", "q").with_peer("Org1MSP");
        let err = query_bid(&module, &ledger, &foreign_peer, "s1", "tx1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        let colleague = CallContext::new("carol", "Org2MSP", "q");
        let err = query_bid(&module, &ledger, &colleague, "s1", "tx1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let other_org = CallContext::new("bob", "Org1MSP", "q");
        let err = query_bid(&module, &ledger, &other_org, "s1", "tx1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_get_id() {
        let ctx = CallContext::new("x509::CN=bob", "Org2MSP", "q");
        assert_eq!(get_id(&ctx), "x509::CN=bob");
    }

    #[test]
    fn test_settlement_summary() {
        let mut session = Session::open("s1".into(), "admin".into(), "Org1MSP".into());
        let entries = [
            ("a", BidSide::Sell, 50, SettlementStatus::PartiallyApproved),
            ("b", BidSide::Sell, 30, SettlementStatus::NotApproved),
            ("c", BidSide::Buy, 40, SettlementStatus::Approved),
        ];
        for (submission, side, volume, status) in entries {
            session.revealed_bids.insert(
                BidKey::new("s1", submission).unwrap(),
                RevealedBid {
                    bid_type: side,
                    volume,
                    org: "Org1MSP".into(),
                    bidder: "alice".into(),
                    status,
                },
            );
        }

        let summary = SettlementSummary::from_session(&session);
        assert_eq!(summary.sell.bids, 2);
        assert_eq!(summary.sell.volume, 80);
        assert_eq!(summary.sell.partially_approved, 1);
        assert_eq!(summary.sell.not_approved, 1);
        assert_eq!(summary.buy.volume, 40);
        assert_eq!(summary.buy.approved, 1);
        assert_eq!(summary.buy.pending, 0);
    }
}
