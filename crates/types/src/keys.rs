//! Composite ledger keys.
//!
//! A composite key is `U+0000 type U+0000 attr1 U+0000 attr2 ... U+0000`.
//! Components may not be empty or contain U+0000, so two keys collide only
//! when the type and every attribute match.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{AssetKind, TypesError};

const SEPARATOR: char = '\u{0}';

/// Object type tag of every bid key.
pub const BID_KEY_TYPE: &str = "bid";

fn check_component(component: &str) -> Result<(), TypesError> {
    if component.is_empty() {
        return Err(TypesError::InvalidKeyComponent {
            component: component.to_string(),
            reason: "must not be empty",
        });
    }
    if component.contains(SEPARATOR) {
        return Err(TypesError::InvalidKeyComponent {
            component: component.to_string(),
            reason: "must not contain U+0000",
        });
    }
    Ok(())
}

/// Build a composite key from an object type and its attributes.
pub fn create_composite_key(object_type: &str, attributes: &[&str]) -> Result<String, TypesError> {
    check_component(object_type)?;
    let mut key = String::new();
    key.push(SEPARATOR);
    key.push_str(object_type);
    key.push(SEPARATOR);
    for attribute in attributes {
        check_component(attribute)?;
        key.push_str(attribute);
        key.push(SEPARATOR);
    }
    Ok(key)
}

/// Split a composite key back into its object type and attributes.
pub fn split_composite_key(key: &str) -> Result<(String, Vec<String>), TypesError> {
    let malformed = || TypesError::MalformedCompositeKey(key.to_string());

    let inner = key
        .strip_prefix(SEPARATOR)
        .and_then(|rest| rest.strip_suffix(SEPARATOR))
        .ok_or_else(malformed)?;

    let mut parts = inner.split(SEPARATOR).map(str::to_string);
    let object_type = parts.next().filter(|t| !t.is_empty()).ok_or_else(malformed)?;
    let attributes: Vec<String> = parts.collect();
    if attributes.iter().any(String::is_empty) {
        return Err(malformed());
    }
    Ok((object_type, attributes))
}

/// Ledger key of a public asset record (a session of the given kind).
pub fn asset_key(kind: AssetKind, id: &str) -> Result<String, TypesError> {
    create_composite_key(kind.object_type(), &[id])
}

/// Join key between a private commitment and its public reveal.
///
/// Ordered by `(session_id, submission_id)`, which is also the byte order of
/// the composite form.
#[derive(
    Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub struct BidKey {
    session_id: String,
    submission_id: String,
}

impl BidKey {
    pub fn new(session_id: &str, submission_id: &str) -> Result<Self, TypesError> {
        check_component(session_id)?;
        check_component(submission_id)?;
        Ok(Self {
            session_id: session_id.to_string(),
            submission_id: submission_id.to_string(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn submission_id(&self) -> &str {
        &self.submission_id
    }

    /// Composite form used as the private-data key and the JSON map key.
    pub fn composite(&self) -> String {
        let mut key = String::with_capacity(
            BID_KEY_TYPE.len() + self.session_id.len() + self.submission_id.len() + 4,
        );
        key.push(SEPARATOR);
        key.push_str(BID_KEY_TYPE);
        key.push(SEPARATOR);
        key.push_str(&self.session_id);
        key.push(SEPARATOR);
        key.push_str(&self.submission_id);
        key.push(SEPARATOR);
        key
    }

    /// Parse the composite form.
    pub fn parse(key: &str) -> Result<Self, TypesError> {
        let (object_type, attributes) = split_composite_key(key)?;
        match (object_type.as_str(), attributes.as_slice()) {
            (BID_KEY_TYPE, [session_id, submission_id]) => Self::new(session_id, submission_id),
            _ => Err(TypesError::MalformedCompositeKey(key.to_string())),
        }
    }
}

impl From<BidKey> for String {
    fn from(key: BidKey) -> Self {
        key.composite()
    }
}

impl TryFrom<String> for BidKey {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        BidKey::parse(&value)
    }
}

impl fmt::Display for BidKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session_id, self.submission_id)
    }
}

impl fmt::Debug for BidKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BidKey({}/{})", self.session_id, self.submission_id)
    }
}
