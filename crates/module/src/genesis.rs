//! Genesis configuration for the session module.
//!
//! Fixed parameters every replica must agree on before the first call is
//! executed.

use serde::{Deserialize, Serialize};

/// Default name of the out-of-band input entry carrying the plaintext bid.
pub const DEFAULT_TRANSIENT_BID_FIELD: &str = "bid";

/// Default prefix of per-organization private partitions.
pub const DEFAULT_IMPLICIT_COLLECTION_PREFIX: &str = "_implicit_org_";

/// Genesis configuration for the session module.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleGenesisConfig {
    /// Transient map entry holding the plaintext bid
    pub transient_bid_field: String,

    /// Private partition of org `O` is `implicit_collection_prefix + O`
    pub implicit_collection_prefix: String,

    /// Upper bound on a single bid's volume (none = unbounded)
    pub max_bid_volume: Option<u64>,
}

impl Default for ModuleGenesisConfig {
    fn default() -> Self {
        Self {
            transient_bid_field: DEFAULT_TRANSIENT_BID_FIELD.to_string(),
            implicit_collection_prefix: DEFAULT_IMPLICIT_COLLECTION_PREFIX.to_string(),
            max_bid_volume: None,
        }
    }
}

impl ModuleGenesisConfig {
    /// Name of the private partition owned by `org`.
    pub fn collection_for(&self, org: &str) -> String {
        format!("{}{}", self.implicit_collection_prefix, org)
    }

    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.transient_bid_field.is_empty() {
            return Err(GenesisValidationError::InvalidField(
                "transient_bid_field cannot be empty".into(),
            ));
        }
        if self.implicit_collection_prefix.is_empty() {
            return Err(GenesisValidationError::InvalidField(
                "implicit_collection_prefix cannot be empty".into(),
            ));
        }
        if self.max_bid_volume == Some(0) {
            return Err(GenesisValidationError::InvalidVolumeBound);
        }
        Ok(())
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Invalid genesis field: {0}")]
    InvalidField(String),

    #[error("max_bid_volume must be greater than zero")]
    InvalidVolumeBound,
}
