//! Call handlers for the session module.
//!
//! Each handler runs against a [`TxContext`]: it reads committed state,
//! computes the next session snapshot, and buffers writes. Nothing reaches
//! the ledger until [`SessionModule::execute`] commits the buffered write
//! set, so a failing handler leaves no trace.

use tracing::{debug, info, warn};

use auction_clearing::clear_revealed;
use auction_types::clearing_io::ClearingOutput;
use auction_types::{asset_key, AssetKind, BidCommitment, BidKey, Session, SubmissionId};

use crate::call::{CallResponse, SessionCall};
use crate::context::CallContext;
use crate::error::{LedgerError, SessionError};
use crate::genesis::{GenesisValidationError, ModuleGenesisConfig};
use crate::ledger::{Ledger, ReadWriteSet, TxContext};
use crate::lifecycle;
use crate::reveal;

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, SessionError>;

/// Outcome of simulating a call: the response plus the write set that
/// committing it would apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simulation {
    pub response: CallResponse,
    pub rw_set: ReadWriteSet,
}

/// Sealed-bid session engine for one asset kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionModule {
    kind: AssetKind,
    config: ModuleGenesisConfig,
}

impl SessionModule {
    pub fn new(kind: AssetKind, config: ModuleGenesisConfig) -> Result<Self, GenesisValidationError> {
        config.validate()?;
        Ok(Self { kind, config })
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn config(&self) -> &ModuleGenesisConfig {
        &self.config
    }

    /// Ledger key of the public record of session `id`.
    pub fn asset_key(&self, id: &str) -> HandlerResult<String> {
        Ok(asset_key(self.kind, id)?)
    }

    /// Execute phase only: run the handler and return its write set.
    pub fn simulate<L: Ledger + ?Sized>(
        &self,
        ledger: &L,
        ctx: &CallContext,
        call: &SessionCall,
    ) -> HandlerResult<Simulation> {
        debug!(
            kind = %self.kind,
            session_id = %call.session_id(),
            principal = %ctx.principal,
            org = %ctx.organization,
            "Simulating call"
        );

        let mut tx = TxContext::new(ledger);
        let response = match call {
            SessionCall::CreateSession { session_id } => {
                handle_create_session(self, &mut tx, ctx, session_id)?;
                CallResponse::Done
            }
            SessionCall::CommitBid { session_id } => {
                let submission_id = handle_commit_bid(self, &mut tx, ctx, session_id)?;
                CallResponse::Committed { submission_id }
            }
            SessionCall::SubmitCommitment {
                session_id,
                submission_id,
            } => {
                handle_submit_commitment(self, &mut tx, ctx, session_id, submission_id)?;
                CallResponse::Done
            }
            SessionCall::CloseSession { session_id } => {
                handle_close_session(self, &mut tx, ctx, session_id)?;
                CallResponse::Done
            }
            SessionCall::RevealBid {
                session_id,
                submission_id,
            } => {
                handle_reveal_bid(self, &mut tx, ctx, session_id, submission_id)?;
                CallResponse::Done
            }
            SessionCall::EndSession { session_id } => {
                CallResponse::Settled(handle_end_session(self, &mut tx, ctx, session_id)?)
            }
        };

        Ok(Simulation {
            response,
            rw_set: tx.into_rw_set(),
        })
    }

    /// Simulate the call, then commit its write set endorsed by `ctx.endorsers`.
    pub fn execute<L: Ledger + ?Sized>(
        &self,
        ledger: &mut L,
        ctx: &CallContext,
        call: &SessionCall,
    ) -> HandlerResult<CallResponse> {
        let Simulation { response, rw_set } = self.simulate(&*ledger, ctx, call)?;
        ledger.commit(rw_set, &ctx.endorsers).map_err(|e| {
            warn!(session_id = %call.session_id(), error = %e, "Commit rejected");
            e
        })?;
        Ok(response)
    }

    fn load_session<L: Ledger + ?Sized>(
        &self,
        tx: &mut TxContext<'_, L>,
        session_id: &str,
    ) -> HandlerResult<(String, Session)> {
        let key = self.asset_key(session_id)?;
        let bytes = tx
            .get_state(&key)?
            .ok_or_else(|| SessionError::session_not_found(session_id))?;
        let session = Session::from_bytes(&bytes).map_err(|e| LedgerError::CorruptRecord {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        Ok((key, session))
    }
}

fn store_session<L: Ledger + ?Sized>(
    tx: &mut TxContext<'_, L>,
    key: &str,
    session: &Session,
) -> HandlerResult<()> {
    tx.put_state(key, session.to_bytes()?);
    Ok(())
}

/// Handle CreateSession call.
pub fn handle_create_session<L: Ledger + ?Sized>(
    module: &SessionModule,
    tx: &mut TxContext<'_, L>,
    ctx: &CallContext,
    session_id: &str,
) -> HandlerResult<()> {
    let key = module.asset_key(session_id)?;
    if tx.get_state(&key)?.is_some() {
        return Err(SessionError::AlreadyExists(format!(
            "{} {session_id}",
            module.kind
        )));
    }

    let session = Session::open(
        session_id.to_string(),
        ctx.principal.clone(),
        ctx.organization.clone(),
    );
    store_session(tx, &key, &session)?;
    tx.set_required_organizations(&key, &session.organizations);

    info!(
        kind = %module.kind,
        session_id = %session_id,
        admin = %ctx.principal,
        org = %ctx.organization,
        "Session created"
    );
    Ok(())
}

/// Handle CommitBid call.
///
/// Stores the transient plaintext in the caller's private partition under
/// the bid key `(session_id, submission_id)` and returns the submission id.
pub fn handle_commit_bid<L: Ledger + ?Sized>(
    module: &SessionModule,
    tx: &mut TxContext<'_, L>,
    ctx: &CallContext,
    session_id: &str,
) -> HandlerResult<SubmissionId> {
    let field = &module.config.transient_bid_field;
    let plaintext = ctx.transient(field).ok_or_else(|| {
        SessionError::ValidationError(format!("{field} key not found in the transient map"))
    })?;

    // The bidder has to target a peer of their own organization.
    ctx.verify_client_org_matches_peer()?;

    let bid = reveal::parse_bid(plaintext, module.config.max_bid_volume)?;
    reveal::ensure_author(&bid, &ctx.principal)?;
    reveal::ensure_organization(&bid, &ctx.organization)?;

    let key = BidKey::new(session_id, &ctx.submission_id)?;
    let collection = module.config.collection_for(&ctx.organization);
    tx.put_private(&collection, &key.composite(), plaintext.to_vec());

    debug!(
        bid_key = %key,
        collection = %collection,
        "Private bid stored"
    );
    Ok(ctx.submission_id.clone())
}

/// Handle SubmitCommitment call.
pub fn handle_submit_commitment<L: Ledger + ?Sized>(
    module: &SessionModule,
    tx: &mut TxContext<'_, L>,
    ctx: &CallContext,
    session_id: &str,
    submission_id: &str,
) -> HandlerResult<()> {
    let (key, session) = module.load_session(tx, session_id)?;
    lifecycle::ensure_status(&session, auction_types::SessionStatus::Open)?;

    let bid_key = BidKey::new(session_id, submission_id)?;
    let collection = module.config.collection_for(&ctx.organization);
    let hash = tx
        .get_private_hash(&collection, &bid_key.composite())?
        .ok_or_else(|| SessionError::NotFound {
            what: "Private bid",
            id: bid_key.to_string(),
        })?;

    let admission = lifecycle::admit_commitment(
        &session,
        bid_key.clone(),
        BidCommitment {
            org: ctx.organization.clone(),
            hash,
        },
    )?;

    if let Some(org) = &admission.new_organization {
        tx.add_required_organization(&key, org)?;
        info!(session_id = %session_id, org = %org, "Organization joined session");
    }
    store_session(tx, &key, &admission.session)?;

    debug!(
        bid_key = %bid_key,
        org = %ctx.organization,
        hash = %hash,
        "Commitment admitted"
    );
    Ok(())
}

/// Handle CloseSession call.
pub fn handle_close_session<L: Ledger + ?Sized>(
    module: &SessionModule,
    tx: &mut TxContext<'_, L>,
    ctx: &CallContext,
    session_id: &str,
) -> HandlerResult<()> {
    let (key, session) = module.load_session(tx, session_id)?;
    lifecycle::ensure_admin(&session, &ctx.principal)?;
    let closed = lifecycle::close(&session)?;
    store_session(tx, &key, &closed)?;

    info!(
        session_id = %session_id,
        commitments = closed.private_bids.len(),
        "Session closed"
    );
    Ok(())
}

/// Handle RevealBid call.
pub fn handle_reveal_bid<L: Ledger + ?Sized>(
    module: &SessionModule,
    tx: &mut TxContext<'_, L>,
    ctx: &CallContext,
    session_id: &str,
    submission_id: &str,
) -> HandlerResult<()> {
    let field = &module.config.transient_bid_field;
    let plaintext = ctx.transient(field).ok_or_else(|| {
        SessionError::ValidationError(format!("{field} key not found in the transient map"))
    })?;

    let bid_key = BidKey::new(session_id, submission_id)?;
    let collection = module.config.collection_for(&ctx.organization);
    let private_hash = tx
        .get_private_hash(&collection, &bid_key.composite())?
        .ok_or_else(|| SessionError::NotFound {
            what: "Private bid",
            id: bid_key.to_string(),
        })?;

    let (key, session) = module.load_session(tx, session_id)?;
    lifecycle::ensure_status(&session, auction_types::SessionStatus::Closed)?;

    let commitment = session
        .commitment(&bid_key)
        .ok_or_else(|| SessionError::NotFound {
            what: "Commitment",
            id: bid_key.to_string(),
        })?;
    reveal::verify_digests(plaintext, &bid_key, &private_hash, commitment).map_err(|e| {
        warn!(bid_key = %bid_key, principal = %ctx.principal, error = %e, "Reveal rejected");
        e
    })?;
    if session.revealed(&bid_key).is_some() {
        return Err(SessionError::AlreadyExists(format!("reveal for bid {bid_key}")));
    }

    let bid = reveal::parse_bid(plaintext, module.config.max_bid_volume)?;
    reveal::ensure_author(&bid, &ctx.principal)?;
    reveal::ensure_organization(&bid, &commitment.org)?;

    let revealed = bid.into_revealed();
    debug!(
        bid_key = %bid_key,
        side = %revealed.bid_type,
        volume = revealed.volume,
        "Bid revealed"
    );
    let next = lifecycle::record_reveal(&session, bid_key, revealed)?;
    store_session(tx, &key, &next)
}

/// Handle EndSession call.
///
/// Clears revealed bids in ascending bid-key order. Each label is written
/// through the session record before the final status change.
pub fn handle_end_session<L: Ledger + ?Sized>(
    module: &SessionModule,
    tx: &mut TxContext<'_, L>,
    ctx: &CallContext,
    session_id: &str,
) -> HandlerResult<ClearingOutput> {
    let (key, session) = module.load_session(tx, session_id)?;
    lifecycle::ensure_admin(&session, &ctx.principal)?;
    lifecycle::ensure_status(&session, auction_types::SessionStatus::Closed)?;
    if session.revealed_bids.is_empty() {
        return Err(SessionError::EmptyReveal(session_id.to_string()));
    }

    let output = clear_revealed(&session.revealed_bids)
        .map_err(|e| SessionError::ValidationError(e.to_string()))?;

    let mut current = session;
    for outcome in &output.outcomes {
        current = lifecycle::apply_outcome(&current, outcome)?;
        store_session(tx, &key, &current)?;
        debug!(
            bid_key = %outcome.bid_key,
            side = %outcome.side,
            volume = outcome.volume,
            status = ?outcome.status,
            "Bid settled"
        );
    }

    let ended = lifecycle::end(&current)?;
    store_session(tx, &key, &ended)?;

    info!(
        session_id = %session_id,
        total_buy = %output.total_buy,
        total_sell = %output.total_sell,
        bids = output.outcomes.len(),
        "Session ended"
    );
    Ok(output)
}
