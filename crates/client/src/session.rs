//! Session client.
//!
//! Drives the session module the way an organization's application does:
//! each mutating call is simulated and committed with the session's current
//! organizations as endorsers.

use std::collections::BTreeSet;

use rand::{CryptoRng, RngCore};
use thiserror::Error;
use tracing::info;

use auction_module::queries::{self, PrivateBid, SettlementSummary};
use auction_module::{CallContext, CallResponse, Ledger, SessionCall, SessionError, SessionModule};
use auction_types::clearing_io::ClearingOutput;
use auction_types::{BidSide, OrgId, PrincipalId, Session, SubmissionId};

use crate::bid::{BidBuilder, BidError, PreparedBid};

/// Errors returned by the session client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Bid(#[from] BidError),

    #[error("Unexpected response to {call}: {response:?}")]
    UnexpectedResponse {
        call: &'static str,
        response: CallResponse,
    },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Who is calling, and from which organization's peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub principal: PrincipalId,
    pub organization: OrgId,
    pub peer_organization: OrgId,
}

impl Identity {
    pub fn new(principal: impl Into<PrincipalId>, organization: impl Into<OrgId>) -> Self {
        let organization = organization.into();
        Self {
            principal: principal.into(),
            peer_organization: organization.clone(),
            organization,
        }
    }

    pub fn with_peer(mut self, peer_organization: impl Into<OrgId>) -> Self {
        self.peer_organization = peer_organization.into();
        self
    }
}

/// Fresh submission id, as the transaction infrastructure would assign.
pub fn new_submission_id<R: RngCore>(rng: &mut R) -> SubmissionId {
    let mut id = [0u8; 16];
    rng.fill_bytes(&mut id);
    hex::encode(id)
}

/// Client for one identity against one ledger.
pub struct SessionClient<'a, L: Ledger> {
    module: &'a SessionModule,
    ledger: &'a mut L,
    identity: Identity,
}

impl<'a, L: Ledger> SessionClient<'a, L> {
    pub fn new(module: &'a SessionModule, ledger: &'a mut L, identity: Identity) -> Self {
        Self {
            module,
            ledger,
            identity,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    fn context(&self, submission_id: SubmissionId) -> CallContext {
        CallContext::new(
            self.identity.principal.clone(),
            self.identity.organization.clone(),
            submission_id,
        )
        .with_peer(self.identity.peer_organization.clone())
    }

    /// Endorse with every organization in the session, or just our own when
    /// the session does not exist yet.
    fn endorsers(&self, session_id: &str) -> BTreeSet<OrgId> {
        let mut endorsers = BTreeSet::from([self.identity.organization.clone()]);
        if let Ok(session) = queries::query_session(self.module, &*self.ledger, session_id) {
            endorsers.extend(session.organizations);
        }
        endorsers
    }

    fn execute<R: RngCore>(
        &mut self,
        call: SessionCall,
        transient: Option<Vec<u8>>,
        rng: &mut R,
    ) -> ClientResult<(SubmissionId, CallResponse)> {
        let submission_id = new_submission_id(rng);
        let mut ctx = self
            .context(submission_id.clone())
            .with_endorsers(self.endorsers(call.session_id()));
        if let Some(plaintext) = transient {
            ctx = ctx.with_transient(self.module.config().transient_bid_field.clone(), plaintext);
        }
        let response = self.module.execute(&mut *self.ledger, &ctx, &call)?;
        Ok((submission_id, response))
    }

    pub fn create_session<R: RngCore>(&mut self, session_id: &str, rng: &mut R) -> ClientResult<()> {
        let call = SessionCall::CreateSession {
            session_id: session_id.to_string(),
        };
        self.execute(call, None, rng)?;
        info!(session_id = %session_id, "Session created");
        Ok(())
    }

    /// Prepare a bid and store it in our organization's private partition.
    pub fn bid<R: RngCore + CryptoRng>(
        &mut self,
        session_id: &str,
        side: BidSide,
        volume: u64,
        rng: &mut R,
    ) -> ClientResult<(SubmissionId, PreparedBid)> {
        let builder = BidBuilder::new(
            side,
            self.identity.organization.clone(),
            self.identity.principal.clone(),
        )
        .volume(volume);
        self.bid_with(session_id, builder, rng)
    }

    /// Build a bid from a configured builder and store it privately.
    pub fn bid_with<R: RngCore + CryptoRng>(
        &mut self,
        session_id: &str,
        builder: BidBuilder,
        rng: &mut R,
    ) -> ClientResult<(SubmissionId, PreparedBid)> {
        let prepared = builder
            .max_volume(self.module.config().max_bid_volume)
            .build(rng)?;
        self.commit_plaintext(session_id, prepared.plaintext.clone(), rng)
            .map(|submission_id| (submission_id, prepared))
    }

    /// Store caller-supplied plaintext bytes as a private bid.
    pub fn commit_plaintext<R: RngCore>(
        &mut self,
        session_id: &str,
        plaintext: Vec<u8>,
        rng: &mut R,
    ) -> ClientResult<SubmissionId> {
        let call = SessionCall::CommitBid {
            session_id: session_id.to_string(),
        };
        match self.execute(call, Some(plaintext), rng)? {
            (_, CallResponse::Committed { submission_id }) => {
                info!(session_id = %session_id, submission_id = %submission_id, "Bid stored");
                Ok(submission_id)
            }
            (_, response) => Err(ClientError::UnexpectedResponse {
                call: "CommitBid",
                response,
            }),
        }
    }

    pub fn submit<R: RngCore>(
        &mut self,
        session_id: &str,
        submission_id: &str,
        rng: &mut R,
    ) -> ClientResult<()> {
        let call = SessionCall::SubmitCommitment {
            session_id: session_id.to_string(),
            submission_id: submission_id.to_string(),
        };
        self.execute(call, None, rng)?;
        Ok(())
    }

    pub fn close<R: RngCore>(&mut self, session_id: &str, rng: &mut R) -> ClientResult<()> {
        let call = SessionCall::CloseSession {
            session_id: session_id.to_string(),
        };
        self.execute(call, None, rng)?;
        Ok(())
    }

    /// Fetch our own stored bid and reveal exactly those bytes.
    pub fn reveal<R: RngCore>(
        &mut self,
        session_id: &str,
        submission_id: &str,
        rng: &mut R,
    ) -> ClientResult<()> {
        let private = self.query_bid(session_id, submission_id)?;
        let call = SessionCall::RevealBid {
            session_id: session_id.to_string(),
            submission_id: submission_id.to_string(),
        };
        self.execute(call, Some(private.plaintext), rng)?;
        Ok(())
    }

    pub fn end<R: RngCore>(&mut self, session_id: &str, rng: &mut R) -> ClientResult<ClearingOutput> {
        let call = SessionCall::EndSession {
            session_id: session_id.to_string(),
        };
        match self.execute(call, None, rng)? {
            (_, CallResponse::Settled(output)) => Ok(output),
            (_, response) => Err(ClientError::UnexpectedResponse {
                call: "EndSession",
                response,
            }),
        }
    }

    pub fn query_session(&self, session_id: &str) -> ClientResult<Session> {
        Ok(queries::query_session(self.module, &*self.ledger, session_id)?)
    }

    pub fn query_bid(&self, session_id: &str, submission_id: &str) -> ClientResult<PrivateBid> {
        let ctx = self.context(String::new());
        Ok(queries::query_bid(
            self.module,
            &*self.ledger,
            &ctx,
            session_id,
            submission_id,
        )?)
    }

    pub fn whoami(&self) -> PrincipalId {
        queries::get_id(&self.context(String::new()))
    }

    pub fn summary(&self, session_id: &str) -> ClientResult<SettlementSummary> {
        let session = self.query_session(session_id)?;
        Ok(SettlementSummary::from_session(&session))
    }
}
