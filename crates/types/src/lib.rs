//! Core record types for sealed-bid double auction sessions.
//!
//! This crate provides the shared data structures used across the auction
//! system: the public session record, the commitments and revealed bids it
//! carries, the private plaintext bid format, and the composite keys that join
//! a private commitment to its later public reveal.
//!
//! All records are serialized as flat JSON objects with stable field names so
//! that every replica re-executing a call produces byte-identical state.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use thiserror::Error;

pub mod clearing_io;
pub mod keys;

pub use keys::{asset_key, create_composite_key, split_composite_key, BidKey, BID_KEY_TYPE};

// =========================
// IDENTIFIERS
// =========================

/// Organization (membership service provider) identifier.
pub type OrgId = String;

/// Caller principal identifier, as reported by the identity provider.
pub type PrincipalId = String;

/// Session identifier chosen by the session creator.
pub type SessionId = String;

/// Per-call identifier supplied by the transaction infrastructure.
pub type SubmissionId = String;

/// Errors raised while building or decoding records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("Invalid key component {component:?}: {reason}")]
    InvalidKeyComponent {
        component: String,
        reason: &'static str,
    },

    #[error("Malformed composite key: {0:?}")]
    MalformedCompositeKey(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Invalid digest: {0}")]
    InvalidDigest(String),
}

// =========================
// COMMITMENT DIGEST
// =========================

/// SHA-256 digest binding a bidder to undisclosed bid content.
///
/// Encoded as a lowercase hex string in JSON records.
#[serde_as]
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct BidDigest(#[serde_as(as = "Hex")] pub [u8; 32]);

impl BidDigest {
    pub const LEN: usize = 32;

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for BidDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BidDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BidDigest({})", self.to_hex())
    }
}

impl FromStr for BidDigest {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| TypesError::InvalidDigest(e.to_string()))?;
        let len = bytes.len();
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TypesError::InvalidDigest(format!("expected 32 bytes, got {len}")))?;
        Ok(Self(array))
    }
}

// =========================
// ENUMERATIONS
// =========================

/// Which of the two ledger asset classes an engine instance manages.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Session,
    Transaction,
}

impl AssetKind {
    /// Object type tag used in the asset's composite ledger key.
    pub fn object_type(&self) -> &'static str {
        match self {
            AssetKind::Session => "session",
            AssetKind::Transaction => "transaction",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.object_type())
    }
}

impl FromStr for AssetKind {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(AssetKind::Session),
            "transaction" => Ok(AssetKind::Transaction),
            other => Err(TypesError::MalformedRecord(format!(
                "unknown asset kind {other:?}"
            ))),
        }
    }
}

/// Session lifecycle status. Only ever advances Open -> Closed -> Ended.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub enum SessionStatus {
    /// Accepting commitments
    Open,
    /// Admin closed it; accepting reveals
    Closed,
    /// Settlement computed; terminal
    Ended,
}

impl SessionStatus {
    /// The single status this one may advance to, if any.
    pub fn successor(&self) -> Option<SessionStatus> {
        match self {
            SessionStatus::Open => Some(SessionStatus::Closed),
            SessionStatus::Closed => Some(SessionStatus::Ended),
            SessionStatus::Ended => None,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Open => "Open",
            SessionStatus::Closed => "Closed",
            SessionStatus::Ended => "Ended",
        };
        f.write_str(s)
    }
}

/// Side of a bid. Exactly two canonical wire values: `"buy"` and `"sell"`.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BidSide {
    Buy,
    Sell,
}

impl BidSide {
    pub fn opposite(&self) -> BidSide {
        match self {
            BidSide::Buy => BidSide::Sell,
            BidSide::Sell => BidSide::Buy,
        }
    }
}

impl fmt::Display for BidSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BidSide::Buy => f.write_str("buy"),
            BidSide::Sell => f.write_str("sell"),
        }
    }
}

impl FromStr for BidSide {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(BidSide::Buy),
            "sell" => Ok(BidSide::Sell),
            other => Err(TypesError::MalformedRecord(format!(
                "bid side must be \"buy\" or \"sell\", got {other:?}"
            ))),
        }
    }
}

/// Settlement status of a revealed bid.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub enum SettlementStatus {
    /// Revealed, awaiting settlement
    Finalized,
    Approved,
    PartiallyApproved,
    NotApproved,
}

impl SettlementStatus {
    /// Whether the clearer has already assigned a final label.
    pub fn is_settled(&self) -> bool {
        !matches!(self, SettlementStatus::Finalized)
    }
}

// =========================
// SESSION RECORDS
// =========================

/// Public record of a committed, not yet revealed bid.
#[derive(
    Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct BidCommitment {
    /// Organization of the committer
    pub org: OrgId,
    /// Digest of the private plaintext at submission time
    pub hash: BidDigest,
}

/// A bid disclosed after the session closed.
#[derive(
    Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct RevealedBid {
    pub bid_type: BidSide,
    pub volume: u64,
    pub org: OrgId,
    pub bidder: PrincipalId,
    pub status: SettlementStatus,
}

/// Public session record stored under the asset's ledger key.
///
/// Maps are ordered by bid key so iteration, encoding and clearing order are
/// identical on every replica.
#[derive(
    Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub admin: PrincipalId,
    /// Participating organizations in order of first admission
    pub organizations: Vec<OrgId>,
    /// Commitments admitted while Open
    pub private_bids: BTreeMap<BidKey, BidCommitment>,
    /// Bids revealed while Closed
    pub revealed_bids: BTreeMap<BidKey, RevealedBid>,
    pub status: SessionStatus,
}

impl Session {
    /// Create a fresh Open session administered by `admin`.
    pub fn open(id: SessionId, admin: PrincipalId, admin_org: OrgId) -> Self {
        Self {
            id,
            admin,
            organizations: vec![admin_org],
            private_bids: BTreeMap::new(),
            revealed_bids: BTreeMap::new(),
            status: SessionStatus::Open,
        }
    }

    pub fn has_organization(&self, org: &str) -> bool {
        self.organizations.iter().any(|o| o == org)
    }

    pub fn commitment(&self, key: &BidKey) -> Option<&BidCommitment> {
        self.private_bids.get(key)
    }

    pub fn revealed(&self, key: &BidKey) -> Option<&RevealedBid> {
        self.revealed_bids.get(key)
    }

    /// Encode as the canonical JSON record.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TypesError> {
        serde_json::to_vec(self).map_err(|e| TypesError::MalformedRecord(e.to_string()))
    }

    /// Decode a JSON session record.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        serde_json::from_slice(bytes).map_err(|e| TypesError::MalformedRecord(e.to_string()))
    }
}

// =========================
// PLAINTEXT BID
// =========================

/// The undisclosed bid content a bidder stores privately and later reveals.
///
/// The digest is taken over the exact bytes the bidder supplied, so a reveal
/// must present byte-identical content; this struct is only the parsed view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlaintextBid {
    pub bid_type: BidSide,
    pub volume: u64,
    pub org: OrgId,
    pub bidder: PrincipalId,
    /// Hex blinding salt so small volumes cannot be guessed from the digest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl PlaintextBid {
    /// Parse plaintext bytes, rejecting unknown fields and non-canonical values.
    pub fn parse(bytes: &[u8]) -> Result<Self, TypesError> {
        serde_json::from_slice(bytes).map_err(|e| TypesError::MalformedRecord(e.to_string()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TypesError> {
        serde_json::to_vec(self).map_err(|e| TypesError::MalformedRecord(e.to_string()))
    }

    /// The public record written when this bid is revealed.
    pub fn into_revealed(self) -> RevealedBid {
        RevealedBid {
            bid_type: self.bid_type,
            volume: self.volume,
            org: self.org,
            bidder: self.bidder,
            status: SettlementStatus::Finalized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key() -> BidKey {
        BidKey::new("s1", "tx1").unwrap()
    }

    #[test]
    fn test_status_successor() {
        assert_eq!(SessionStatus::Open.successor(), Some(SessionStatus::Closed));
        assert_eq!(SessionStatus::Closed.successor(), Some(SessionStatus::Ended));
        assert_eq!(SessionStatus::Ended.successor(), None);
    }

    #[test]
    fn test_bid_side_is_closed() {
        assert_eq!("sell".parse::<BidSide>().unwrap(), BidSide::Sell);
        assert!("Sell".parse::<BidSide>().is_err());
        assert!("SELL".parse::<BidSide>().is_err());
    }

    #[test]
    fn test_plaintext_rejects_case_variant() {
        let json = br#"{"bidType":"Sell","volume":5,"org":"Org1MSP","bidder":"alice"}"#;
        assert!(PlaintextBid::parse(json).is_err());
    }

    #[test]
    fn test_plaintext_rejects_negative_volume() {
        let json = br#"{"bidType":"buy","volume":-5,"org":"Org1MSP","bidder":"alice"}"#;
        assert!(PlaintextBid::parse(json).is_err());
    }

    #[test]
    fn test_plaintext_rejects_unknown_field() {
        let json =
            br#"{"bidType":"buy","volume":5,"org":"Org1MSP","bidder":"alice","price":3}"#;
        assert!(PlaintextBid::parse(json).is_err());
    }

    #[test]
    fn test_plaintext_parses_with_salt() {
        let json = br#"{"bidType":"buy","volume":5,"org":"Org1MSP","bidder":"alice","salt":"ab"}"#;
        let bid = PlaintextBid::parse(json).unwrap();
        assert_eq!(bid.bid_type, BidSide::Buy);
        assert_eq!(bid.volume, 5);
        assert_eq!(bid.salt.as_deref(), Some("ab"));
        assert_eq!(bid.into_revealed().status, SettlementStatus::Finalized);
    }

    #[test]
    fn test_session_json_field_names() {
        let mut session = Session::open("s1".into(), "admin".into(), "Org1MSP".into());
        session.private_bids.insert(
            sample_key(),
            BidCommitment {
                org: "Org1MSP".into(),
                hash: BidDigest([7u8; 32]),
            },
        );

        let value: serde_json::Value =
            serde_json::from_slice(&session.to_bytes().unwrap()).unwrap();
        assert_eq!(value["status"], "Open");
        assert_eq!(value["organizations"][0], "Org1MSP");
        assert!(value["privateBids"].is_object());
        assert!(value["revealedBids"].is_object());

        let commitment = value["privateBids"]
            .as_object()
            .unwrap()
            .values()
            .next()
            .unwrap();
        assert_eq!(commitment["hash"], hex::encode([7u8; 32]));
    }

    #[test]
    fn test_session_record_decodes_to_same_value() {
        let mut session = Session::open("s1".into(), "admin".into(), "Org1MSP".into());
        session.revealed_bids.insert(
            sample_key(),
            RevealedBid {
                bid_type: BidSide::Sell,
                volume: 50,
                org: "Org1MSP".into(),
                bidder: "alice".into(),
                status: SettlementStatus::Finalized,
            },
        );
        let bytes = session.to_bytes().unwrap();
        assert_eq!(Session::from_bytes(&bytes).unwrap(), session);
        // Encoding is deterministic.
        assert_eq!(bytes, session.clone().to_bytes().unwrap());
    }

    #[test]
    fn test_digest_hex_parse() {
        let digest = BidDigest([0xabu8; 32]);
        let parsed: BidDigest = digest.to_hex().parse().unwrap();
        assert_eq!(parsed, digest);
        assert!("abcd".parse::<BidDigest>().is_err());
        assert!("zz".parse::<BidDigest>().is_err());
    }

    #[test]
    fn test_borsh_encoding() {
        let commitment = BidCommitment {
            org: "Org2MSP".into(),
            hash: BidDigest([1u8; 32]),
        };
        let encoded = borsh::to_vec(&commitment).unwrap();
        let decoded: BidCommitment = borsh::from_slice(&encoded).unwrap();
        assert_eq!(decoded, commitment);
    }
}
