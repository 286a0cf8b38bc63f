//! Per-call context supplied by the runtime.

use std::collections::{BTreeMap, BTreeSet};

use auction_types::{OrgId, PrincipalId, SubmissionId};

use crate::error::SessionError;
use crate::handlers::HandlerResult;

/// Context provided by the runtime for each call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Calling principal (identity provider)
    pub principal: PrincipalId,
    /// Calling principal's organization (identity provider)
    pub organization: OrgId,
    /// Organization of the replica executing the call
    pub peer_organization: OrgId,
    /// Per-call identifier assigned by the transaction infrastructure
    pub submission_id: SubmissionId,
    /// Out-of-band inputs; never written to committed history
    pub transient: BTreeMap<String, Vec<u8>>,
    /// Organizations that endorsed this call
    pub endorsers: BTreeSet<OrgId>,
}

impl CallContext {
    /// Context executed on the caller's own organization, endorsed by it alone.
    pub fn new(
        principal: impl Into<PrincipalId>,
        organization: impl Into<OrgId>,
        submission_id: impl Into<SubmissionId>,
    ) -> Self {
        let organization = organization.into();
        Self {
            principal: principal.into(),
            peer_organization: organization.clone(),
            endorsers: BTreeSet::from([organization.clone()]),
            organization,
            submission_id: submission_id.into(),
            transient: BTreeMap::new(),
        }
    }

    pub fn with_peer(mut self, peer_organization: impl Into<OrgId>) -> Self {
        self.peer_organization = peer_organization.into();
        self
    }

    pub fn with_transient(mut self, field: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.transient.insert(field.into(), value.into());
        self
    }

    pub fn with_endorsers<I, O>(mut self, orgs: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<OrgId>,
    {
        self.endorsers = orgs.into_iter().map(Into::into).collect();
        self
    }

    pub fn transient(&self, field: &str) -> Option<&[u8]> {
        self.transient.get(field).map(Vec::as_slice)
    }

    /// The caller may only touch the private partition of the organization
    /// whose replica executes the call.
    pub fn verify_client_org_matches_peer(&self) -> HandlerResult<()> {
        if self.organization != self.peer_organization {
            return Err(SessionError::PermissionDenied(format!(
                "client from org {} is not authorized to read or write private data from an org {} peer",
                self.organization, self.peer_organization
            )));
        }
        Ok(())
    }
}
