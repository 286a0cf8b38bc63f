//! Call message types for the session module.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use auction_types::clearing_io::ClearingOutput;
use auction_types::{SessionId, SubmissionId};

/// Call messages for the session module.
///
/// Plaintext bids never appear here; they travel in the call's transient map.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum SessionCall {
    // === Session Lifecycle ===
    /// Create a new Open session administered by the caller.
    CreateSession { session_id: SessionId },

    /// Close bidding (admin only).
    CloseSession { session_id: SessionId },

    /// Settle revealed bids and end the session (admin only).
    EndSession { session_id: SessionId },

    // === Bidding ===
    /// Store the transient plaintext bid in the caller's private partition.
    CommitBid { session_id: SessionId },

    /// Record the digest of a stored private bid in the session.
    SubmitCommitment {
        session_id: SessionId,
        submission_id: SubmissionId,
    },

    /// Disclose a committed bid after close.
    RevealBid {
        session_id: SessionId,
        submission_id: SubmissionId,
    },
}

impl SessionCall {
    pub fn session_id(&self) -> &str {
        match self {
            SessionCall::CreateSession { session_id }
            | SessionCall::CloseSession { session_id }
            | SessionCall::EndSession { session_id }
            | SessionCall::CommitBid { session_id }
            | SessionCall::SubmitCommitment { session_id, .. }
            | SessionCall::RevealBid { session_id, .. } => session_id,
        }
    }

    /// Whether the call writes to the caller's private partition.
    pub fn touches_private_data(&self) -> bool {
        matches!(self, SessionCall::CommitBid { .. })
    }
}

/// Value returned to the caller of a successful call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallResponse {
    /// Nothing to report beyond success.
    Done,
    /// Submission id under which a private bid was stored.
    Committed { submission_id: SubmissionId },
    /// Settlement computed by EndSession.
    Settled(ClearingOutput),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_borsh_encoding() {
        let call = SessionCall::RevealBid {
            session_id: "s1".into(),
            submission_id: "tx1".into(),
        };
        let encoded = borsh::to_vec(&call).unwrap();
        let decoded: SessionCall = borsh::from_slice(&encoded).unwrap();
        assert_eq!(decoded, call);
        assert_eq!(decoded.session_id(), "s1");
    }

    #[test]
    fn test_private_data_calls() {
        assert!(SessionCall::CommitBid { session_id: "s1".into() }.touches_private_data());
        assert!(!SessionCall::CloseSession { session_id: "s1".into() }.touches_private_data());
    }
}
