//! End-to-end integration tests for sealed-bid auction sessions.
//!
//! These tests exercise the full session lifecycle against the in-memory
//! ledger:
//! 1. Session creation
//! 2. Private bid storage and commitment submission
//! 3. Close and verified reveal
//! 4. Settlement
//! 5. Endorsement and read-conflict enforcement at commit

use auction_client::{Identity, SessionClient};
use auction_module::{
    CallContext, CallResponse, ErrorKind, Ledger, LedgerError, MemoryLedger, ModuleGenesisConfig,
    SessionCall, SessionError, SessionModule, TxContext,
};
use auction_types::clearing_io::ClearingOutput;
use auction_types::{AssetKind, BidKey, BidSide, Session, SessionStatus, SettlementStatus};

use rand::rngs::OsRng;
use std::collections::BTreeSet;

const ALL_ORGS: [&str; 3] = ["Org1MSP", "Org2MSP", "Org3MSP"];

/// Test the complete two-organization flow through the client SDK.
#[test]
fn test_full_two_org_lifecycle() {
    let module = session_module(AssetKind::Session);
    let mut ledger = MemoryLedger::new();
    let mut rng = OsRng;

    // ========================================
    // Phase 1: Org1 admin opens the session
    // ========================================

    SessionClient::new(&module, &mut ledger, Identity::new("admin", "Org1MSP"))
        .create_session("auction-1", &mut rng)
        .unwrap();

    // ========================================
    // Phase 2: Bidders from two orgs commit
    // ========================================

    let mut seller = SessionClient::new(&module, &mut ledger, Identity::new("seller", "Org1MSP"));
    let (sell_id, _) = seller.bid("auction-1", BidSide::Sell, 70, &mut rng).unwrap();
    seller.submit("auction-1", &sell_id, &mut rng).unwrap();

    let mut buyer = SessionClient::new(&module, &mut ledger, Identity::new("buyer", "Org2MSP"));
    let (buy_id, prepared) = buyer.bid("auction-1", BidSide::Buy, 40, &mut rng).unwrap();
    buyer.submit("auction-1", &buy_id, &mut rng).unwrap();

    let session = buyer.query_session("auction-1").unwrap();
    assert_eq!(session.organizations, vec!["Org1MSP", "Org2MSP"]);
    let buy_key = BidKey::new("auction-1", &buy_id).unwrap();
    assert_eq!(session.commitment(&buy_key).unwrap().hash, prepared.digest);
    // Nothing about the bid content is public yet.
    assert!(session.revealed_bids.is_empty());

    // ========================================
    // Phase 3: Close and reveal
    // ========================================

    SessionClient::new(&module, &mut ledger, Identity::new("admin", "Org1MSP"))
        .close("auction-1", &mut rng)
        .unwrap();
    SessionClient::new(&module, &mut ledger, Identity::new("seller", "Org1MSP"))
        .reveal("auction-1", &sell_id, &mut rng)
        .unwrap();
    SessionClient::new(&module, &mut ledger, Identity::new("buyer", "Org2MSP"))
        .reveal("auction-1", &buy_id, &mut rng)
        .unwrap();

    // ========================================
    // Phase 4: Settle
    // ========================================

    let mut admin = SessionClient::new(&module, &mut ledger, Identity::new("admin", "Org1MSP"));
    let output = admin.end("auction-1", &mut rng).unwrap();
    assert_conserved(&output);

    let summary = admin.summary("auction-1").unwrap();
    assert_eq!(summary.status, SessionStatus::Ended);
    // sell 70 vs buy 40: exhausts the buy side
    assert_eq!(summary.sell.partially_approved, 1);
    // buy 40 vs sell 70
    assert_eq!(summary.buy.approved, 1);
}

/// Sells {S1=50, S2=30} and Buy {B1=40}, cleared in that order.
#[test]
fn test_scenario_mixed_sides() {
    let mut h = Harness::new();
    h.create("s1");
    h.place("s1", "alice", "Org1MSP", "tx-1", BidSide::Sell, 50);
    h.place("s1", "bob", "Org2MSP", "tx-2", BidSide::Sell, 30);
    h.place("s1", "carol", "Org3MSP", "tx-3", BidSide::Buy, 40);
    h.close("s1").unwrap();
    h.reveal("s1", "alice", "Org1MSP", "tx-1").unwrap();
    h.reveal("s1", "bob", "Org2MSP", "tx-2").unwrap();
    h.reveal("s1", "carol", "Org3MSP", "tx-3").unwrap();

    let output = h.end("s1").unwrap();
    assert_eq!(output.total_buy, 40);
    assert_eq!(output.total_sell, 80);
    assert_conserved(&output);

    let session = h.session("s1");
    assert_eq!(session.status, SessionStatus::Ended);
    assert_eq!(status_of(&session, "tx-1"), SettlementStatus::PartiallyApproved);
    assert_eq!(status_of(&session, "tx-2"), SettlementStatus::NotApproved);
    assert_eq!(status_of(&session, "tx-3"), SettlementStatus::Approved);
}

/// A reveal with a tampered volume fails even though bidder and org match.
#[test]
fn test_scenario_tampered_volume() {
    let mut h = Harness::new();
    h.create("s1");
    h.place("s1", "alice", "Org1MSP", "tx-1", BidSide::Sell, 50);
    h.close("s1").unwrap();

    let tampered = bid_json(BidSide::Sell, 5, "Org1MSP", "alice");
    let err = h
        .reveal_bytes("s1", "alice", "Org1MSP", "tx-1", tampered)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HashMismatch);
    assert!(h.session("s1").revealed_bids.is_empty());
}

/// CloseSession by a non-admin fails and the session stays Open.
#[test]
fn test_scenario_non_admin_close() {
    let mut h = Harness::new();
    h.create("s1");

    let err = h
        .call("mallory", "Org1MSP", "tx-x", SessionCall::CloseSession { session_id: "s1".into() })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(h.session("s1").status, SessionStatus::Open);
}

/// EndSession with zero reveals fails and the session stays Closed.
#[test]
fn test_scenario_empty_reveal() {
    let mut h = Harness::new();
    h.create("s1");
    h.place("s1", "alice", "Org1MSP", "tx-1", BidSide::Sell, 50);
    h.close("s1").unwrap();

    let err = h.end("s1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyReveal);
    assert_eq!(h.session("s1").status, SessionStatus::Closed);
}

/// Swapping the private entry after submission is caught by the second check.
#[test]
fn test_private_entry_replaced_after_submit() {
    let mut h = Harness::new();
    h.create("s1");
    h.place("s1", "alice", "Org1MSP", "tx-1", BidSide::Sell, 5);
    h.close("s1").unwrap();

    // Overwrite the stored plaintext directly in the private partition.
    let replacement = bid_json(BidSide::Sell, 500, "Org1MSP", "alice");
    let collection = h.module.config().collection_for("Org1MSP");
    let key = BidKey::new("s1", "tx-1").unwrap().composite();
    let mut tx = TxContext::new(&h.ledger);
    tx.put_private(&collection, &key, replacement.clone());
    let rw_set = tx.into_rw_set();
    h.ledger.commit(rw_set, &BTreeSet::new()).unwrap();

    let err = h
        .reveal_bytes("s1", "alice", "Org1MSP", "tx-1", replacement)
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::HashMismatch {
            reason: "content does not match the commitment recorded at submission",
            ..
        }
    ));
}

/// A second reveal of the same bid is rejected, so settlement counts it once.
#[test]
fn test_double_reveal_rejected() {
    let mut h = Harness::new();
    h.create("s1");
    h.place("s1", "alice", "Org1MSP", "tx-1", BidSide::Buy, 10);
    h.place("s1", "bob", "Org2MSP", "tx-2", BidSide::Sell, 10);
    h.close("s1").unwrap();
    h.reveal("s1", "alice", "Org1MSP", "tx-1").unwrap();

    let before = h.ledger.clone();
    let err = h.reveal("s1", "alice", "Org1MSP", "tx-1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(h.ledger, before);

    h.reveal("s1", "bob", "Org2MSP", "tx-2").unwrap();
    let output = h.end("s1").unwrap();
    assert_eq!(output.outcomes.len(), 2);
    assert_eq!(output.total_buy, 10);
}

/// Lifecycle order is strictly Open -> Closed -> Ended.
#[test]
fn test_status_transitions() {
    let mut h = Harness::new();
    h.create("s1");
    h.place("s1", "alice", "Org1MSP", "tx-1", BidSide::Buy, 10);

    assert_eq!(h.end("s1").unwrap_err().kind(), ErrorKind::InvalidState);
    h.close("s1").unwrap();
    assert_eq!(h.close("s1").unwrap_err().kind(), ErrorKind::InvalidState);

    h.reveal("s1", "alice", "Org1MSP", "tx-1").unwrap();
    h.end("s1").unwrap();
    assert_eq!(h.end("s1").unwrap_err().kind(), ErrorKind::InvalidState);
    assert_eq!(h.close("s1").unwrap_err().kind(), ErrorKind::InvalidState);
    assert_eq!(h.session("s1").status, SessionStatus::Ended);
}

/// Once an organization has joined, its endorsement is required.
#[test]
fn test_endorsement_requires_joined_orgs() {
    let mut h = Harness::new();
    h.create("s1");
    h.place("s1", "bob", "Org2MSP", "tx-1", BidSide::Buy, 10);

    let ctx = CallContext::new("admin", "Org1MSP", "tx-close").with_endorsers(["Org1MSP"]);
    let call = SessionCall::CloseSession { session_id: "s1".into() };
    let err = h.module.execute(&mut h.ledger, &ctx, &call).unwrap_err();
    assert_eq!(
        err,
        SessionError::Ledger(LedgerError::EndorsementPolicyFailure {
            key: h.module.asset_key("s1").unwrap(),
            missing: vec!["Org2MSP".into()],
        })
    );
    assert_eq!(h.session("s1").status, SessionStatus::Open);

    let ctx = ctx.with_endorsers(["Org1MSP", "Org2MSP"]);
    h.module.execute(&mut h.ledger, &ctx, &call).unwrap();
    assert_eq!(h.session("s1").status, SessionStatus::Closed);
}

/// Two reveals simulated against the same state conflict at commit.
#[test]
fn test_concurrent_reveals_conflict() {
    let mut h = Harness::new();
    h.create("s1");
    h.place("s1", "alice", "Org1MSP", "tx-1", BidSide::Buy, 10);
    h.place("s1", "bob", "Org2MSP", "tx-2", BidSide::Sell, 10);
    h.close("s1").unwrap();

    let alice = h.reveal_context("s1", "alice", "Org1MSP", "tx-1");
    let bob = h.reveal_context("s1", "bob", "Org2MSP", "tx-2");
    let alice_call = reveal_call("s1", "tx-1");
    let bob_call = reveal_call("s1", "tx-2");

    let first = h.module.simulate(&h.ledger, &alice, &alice_call).unwrap();
    let second = h.module.simulate(&h.ledger, &bob, &bob_call).unwrap();

    h.ledger.commit(first.rw_set, &alice.endorsers).unwrap();
    let err = h.ledger.commit(second.rw_set, &bob.endorsers).unwrap_err();
    assert!(matches!(err, LedgerError::ReadConflict { .. }));
    assert_eq!(h.session("s1").revealed_bids.len(), 1);

    // The client resubmits against the new state.
    h.module.execute(&mut h.ledger, &bob, &bob_call).unwrap();
    assert_eq!(h.session("s1").revealed_bids.len(), 2);
}

/// Session and transaction engines share a ledger without interfering.
#[test]
fn test_asset_kinds_are_independent() {
    let mut ledger = MemoryLedger::new();
    let sessions = session_module(AssetKind::Session);
    let transactions = session_module(AssetKind::Transaction);
    let admin = CallContext::new("admin", "Org1MSP", "tx0").with_endorsers(ALL_ORGS);
    let create = SessionCall::CreateSession { session_id: "x".into() };

    sessions.execute(&mut ledger, &admin, &create).unwrap();
    transactions.execute(&mut ledger, &admin, &create).unwrap();
    assert_eq!(
        sessions.execute(&mut ledger, &admin, &create).unwrap_err().kind(),
        ErrorKind::AlreadyExists
    );

    let close = SessionCall::CloseSession { session_id: "x".into() };
    sessions.execute(&mut ledger, &admin, &close).unwrap();

    let read = |module: &SessionModule| {
        let bytes = ledger
            .get_state(&module.asset_key("x").unwrap())
            .unwrap()
            .unwrap();
        Session::from_bytes(&bytes).unwrap().status
    };
    assert_eq!(read(&sessions), SessionStatus::Closed);
    assert_eq!(read(&transactions), SessionStatus::Open);
}

/// Replicas executing the same calls end in byte-identical state.
#[test]
fn test_replicas_agree() {
    let run = || {
        let mut h = Harness::new();
        h.create("s1");
        h.place("s1", "a", "Org1MSP", "tx-09", BidSide::Buy, 15);
        h.place("s1", "b", "Org2MSP", "tx-03", BidSide::Sell, 7);
        h.place("s1", "c", "Org3MSP", "tx-05", BidSide::Sell, 20);
        h.place("s1", "d", "Org1MSP", "tx-01", BidSide::Buy, 4);
        h.close("s1").unwrap();
        // Reveal in a different order from submission.
        for (who, org, tx) in [
            ("c", "Org3MSP", "tx-05"),
            ("a", "Org1MSP", "tx-09"),
            ("d", "Org1MSP", "tx-01"),
            ("b", "Org2MSP", "tx-03"),
        ] {
            h.reveal("s1", who, org, tx).unwrap();
        }
        let output = h.end("s1").unwrap();
        (serde_json::to_vec(&h.ledger).unwrap(), output)
    };

    let (replica_a, output_a) = run();
    let (replica_b, output_b) = run();
    assert_eq!(replica_a, replica_b);
    assert_eq!(output_a, output_b);

    // Cleared in ascending bid-key order regardless of reveal order.
    let order: Vec<&str> = output_a
        .outcomes
        .iter()
        .map(|o| o.bid_key.submission_id())
        .collect();
    assert_eq!(order, vec!["tx-01", "tx-03", "tx-05", "tx-09"]);
    assert_conserved(&output_a);
}

/// Bids can only be stored from a peer of the bidder's own organization.
#[test]
fn test_commit_on_foreign_peer_denied() {
    let mut h = Harness::new();
    h.create("s1");

    let ctx = CallContext::new("bob", "Org2MSP", "tx-1")
        .with_peer("Org1MSP")
        .with_endorsers(ALL_ORGS)
        .with_transient("bid", bid_json(BidSide::Buy, 3, "Org2MSP", "bob"));
    let call = SessionCall::CommitBid { session_id: "s1".into() };
    let err = h.module.execute(&mut h.ledger, &ctx, &call).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

/// The genesis volume bound is enforced when a bid is stored.
#[test]
fn test_volume_bound_from_genesis() {
    let config = ModuleGenesisConfig {
        max_bid_volume: Some(100),
        ..Default::default()
    };
    let module = SessionModule::new(AssetKind::Session, config).unwrap();
    let mut ledger = MemoryLedger::new();

    let ctx = CallContext::new("alice", "Org1MSP", "tx-1")
        .with_transient("bid", bid_json(BidSide::Sell, 101, "Org1MSP", "alice"));
    let call = SessionCall::CommitBid { session_id: "s1".into() };
    let err = module.execute(&mut ledger, &ctx, &call).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

// Helper functions

struct Harness {
    module: SessionModule,
    ledger: MemoryLedger,
}

impl Harness {
    fn new() -> Self {
        Self {
            module: session_module(AssetKind::Session),
            ledger: MemoryLedger::new(),
        }
    }

    fn call(
        &mut self,
        principal: &str,
        org: &str,
        tx_id: &str,
        call: SessionCall,
    ) -> Result<CallResponse, SessionError> {
        let ctx = CallContext::new(principal, org, tx_id).with_endorsers(ALL_ORGS);
        self.module.execute(&mut self.ledger, &ctx, &call)
    }

    fn create(&mut self, session_id: &str) {
        let call = SessionCall::CreateSession {
            session_id: session_id.into(),
        };
        self.call("admin", "Org1MSP", "tx-create", call).unwrap();
    }

    /// Store and submit a bid under submission id `tx_id`.
    fn place(
        &mut self,
        session_id: &str,
        bidder: &str,
        org: &str,
        tx_id: &str,
        side: BidSide,
        volume: u64,
    ) {
        let ctx = CallContext::new(bidder, org, tx_id)
            .with_endorsers(ALL_ORGS)
            .with_transient("bid", bid_json(side, volume, org, bidder));
        let call = SessionCall::CommitBid {
            session_id: session_id.into(),
        };
        self.module.execute(&mut self.ledger, &ctx, &call).unwrap();

        let call = SessionCall::SubmitCommitment {
            session_id: session_id.into(),
            submission_id: tx_id.into(),
        };
        self.call(bidder, org, "tx-submit", call).unwrap();
    }

    fn close(&mut self, session_id: &str) -> Result<CallResponse, SessionError> {
        let call = SessionCall::CloseSession {
            session_id: session_id.into(),
        };
        self.call("admin", "Org1MSP", "tx-close", call)
    }

    fn end(&mut self, session_id: &str) -> Result<ClearingOutput, SessionError> {
        let call = SessionCall::EndSession {
            session_id: session_id.into(),
        };
        match self.call("admin", "Org1MSP", "tx-end", call)? {
            CallResponse::Settled(output) => Ok(output),
            other => panic!("unexpected response {other:?}"),
        }
    }

    /// Context carrying the bidder's own stored plaintext.
    fn reveal_context(&self, session_id: &str, bidder: &str, org: &str, tx_id: &str) -> CallContext {
        let ctx = CallContext::new(bidder, org, "tx-reveal").with_endorsers(ALL_ORGS);
        let stored = auction_module::queries::query_bid(&self.module, &self.ledger, &ctx, session_id, tx_id)
            .unwrap();
        ctx.with_transient("bid", stored.plaintext)
    }

    fn reveal(
        &mut self,
        session_id: &str,
        bidder: &str,
        org: &str,
        tx_id: &str,
    ) -> Result<CallResponse, SessionError> {
        let ctx = self.reveal_context(session_id, bidder, org, tx_id);
        self.module
            .execute(&mut self.ledger, &ctx, &reveal_call(session_id, tx_id))
    }

    fn reveal_bytes(
        &mut self,
        session_id: &str,
        bidder: &str,
        org: &str,
        tx_id: &str,
        plaintext: Vec<u8>,
    ) -> Result<CallResponse, SessionError> {
        let ctx = CallContext::new(bidder, org, "tx-reveal")
            .with_endorsers(ALL_ORGS)
            .with_transient("bid", plaintext);
        self.module
            .execute(&mut self.ledger, &ctx, &reveal_call(session_id, tx_id))
    }

    fn session(&self, session_id: &str) -> Session {
        auction_module::queries::query_session(&self.module, &self.ledger, session_id).unwrap()
    }
}

fn session_module(kind: AssetKind) -> SessionModule {
    SessionModule::new(kind, ModuleGenesisConfig::default()).unwrap()
}

fn reveal_call(session_id: &str, submission_id: &str) -> SessionCall {
    SessionCall::RevealBid {
        session_id: session_id.into(),
        submission_id: submission_id.into(),
    }
}

fn bid_json(side: BidSide, volume: u64, org: &str, bidder: &str) -> Vec<u8> {
    format!(r#"{{"bidType":"{side}","volume":{volume},"org":"{org}","bidder":"{bidder}"}}"#)
        .into_bytes()
}

fn status_of(session: &Session, submission_id: &str) -> SettlementStatus {
    let key = BidKey::new(&session.id, submission_id).unwrap();
    session.revealed(&key).unwrap().status
}

/// Approved plus partially approved volume on a side never exceeds the
/// opposing total.
fn assert_conserved(output: &ClearingOutput) {
    for side in [BidSide::Buy, BidSide::Sell] {
        let opposing = match side {
            BidSide::Buy => output.total_sell,
            BidSide::Sell => output.total_buy,
        };
        assert!(output.matched_volume(side) <= opposing);
        assert!(output.count(side, SettlementStatus::PartiallyApproved) <= 1);
    }
}
