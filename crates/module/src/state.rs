//! In-memory ledger.
//!
//! A deterministic stand-in for the replicated key-value ledger, its
//! per-organization private partitions and its state-based endorsement
//! policies. Everything is kept in ordered maps so that two ledgers fed the
//! same calls serialize to identical bytes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use auction_types::{BidDigest, OrgId};

use crate::error::LedgerError;
use crate::ledger::{Ledger, ReadWriteSet, Version};

/// A public value with its write version.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedValue {
    #[serde_as(as = "Hex")]
    pub value: Vec<u8>,
    pub version: Version,
}

/// In-memory ledger state.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLedger {
    /// Public world state
    public: BTreeMap<String, VersionedValue>,

    /// Private partitions: collection -> key -> content
    #[serde_as(as = "BTreeMap<_, BTreeMap<_, Hex>>")]
    private: BTreeMap<String, BTreeMap<String, Vec<u8>>>,

    /// Required endorsing organizations per public key
    endorsement: BTreeMap<String, Vec<OrgId>>,

    /// Number of committed write sets
    height: u64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// Public keys in ascending order.
    pub fn public_keys(&self) -> impl Iterator<Item = &str> {
        self.public.keys().map(String::as_str)
    }

    fn check_reads(&self, rw_set: &ReadWriteSet) -> Result<(), LedgerError> {
        for (key, read_version) in &rw_set.reads {
            let current_version = self.version(key);
            if current_version != *read_version {
                return Err(LedgerError::ReadConflict {
                    key: key.clone(),
                    read_version: *read_version,
                    current_version,
                });
            }
        }
        Ok(())
    }

    fn check_endorsements(
        &self,
        rw_set: &ReadWriteSet,
        endorsers: &BTreeSet<OrgId>,
    ) -> Result<(), LedgerError> {
        for key in rw_set.mutated_keys() {
            let Some(required) = self.endorsement.get(key) else {
                continue;
            };
            let missing: Vec<OrgId> = required
                .iter()
                .filter(|org| !endorsers.contains(*org))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(LedgerError::EndorsementPolicyFailure {
                    key: key.to_string(),
                    missing,
                });
            }
        }
        Ok(())
    }
}

impl Ledger for MemoryLedger {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.public.get(key).map(|v| v.value.clone()))
    }

    fn version(&self, key: &str) -> Version {
        self.public.get(key).map(|v| v.version).unwrap_or(0)
    }

    fn get_private(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self
            .private
            .get(collection)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn get_private_hash(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<BidDigest>, LedgerError> {
        Ok(self
            .private
            .get(collection)
            .and_then(|entries| entries.get(key))
            .map(|content| auction_crypto::bid_digest(content)))
    }

    fn required_organizations(&self, key: &str) -> Result<Option<Vec<OrgId>>, LedgerError> {
        Ok(self.endorsement.get(key).cloned())
    }

    fn commit(
        &mut self,
        rw_set: ReadWriteSet,
        endorsers: &BTreeSet<OrgId>,
    ) -> Result<(), LedgerError> {
        // Validate against the policy in force before this write set.
        self.check_reads(&rw_set)?;
        self.check_endorsements(&rw_set, endorsers)?;

        for (key, value) in rw_set.writes {
            let version = self.version(&key) + 1;
            self.public.insert(key, VersionedValue { value, version });
        }
        for ((collection, key), value) in rw_set.private_writes {
            self.private.entry(collection).or_default().insert(key, value);
        }
        for (key, orgs) in rw_set.endorsement_updates {
            self.endorsement.insert(key, orgs);
        }
        self.height += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TxContext;

    fn orgs(names: &[&str]) -> BTreeSet<OrgId> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn write(ledger: &mut MemoryLedger, key: &str, value: &[u8], endorsers: &[&str]) -> Result<(), LedgerError> {
        let mut tx = TxContext::new(&*ledger);
        tx.get_state(key)?;
        tx.put_state(key, value.to_vec());
        let rw_set = tx.into_rw_set();
        ledger.commit(rw_set, &orgs(endorsers))
    }

    #[test]
    fn test_commit_bumps_versions() {
        let mut ledger = MemoryLedger::new();
        write(&mut ledger, "k", b"1", &[]).unwrap();
        write(&mut ledger, "k", b"2", &[]).unwrap();
        assert_eq!(ledger.version("k"), 2);
        assert_eq!(ledger.get_state("k").unwrap(), Some(b"2".to_vec()));
        assert_eq!(ledger.height(), 2);
    }

    #[test]
    fn test_stale_read_is_rejected() {
        let mut ledger = MemoryLedger::new();
        write(&mut ledger, "k", b"1", &[]).unwrap();

        // Two calls simulated against the same committed state.
        let mut first = TxContext::new(&ledger);
        first.get_state("k").unwrap();
        first.put_state("k", b"first".to_vec());
        let first = first.into_rw_set();

        let mut second = TxContext::new(&ledger);
        second.get_state("k").unwrap();
        second.put_state("k", b"second".to_vec());
        let second = second.into_rw_set();

        ledger.commit(first, &BTreeSet::new()).unwrap();
        let err = ledger.commit(second, &BTreeSet::new()).unwrap_err();
        assert!(matches!(err, LedgerError::ReadConflict { read_version: 1, current_version: 2, .. }));
        assert_eq!(ledger.get_state("k").unwrap(), Some(b"first".to_vec()));
    }

    #[test]
    fn test_endorsement_policy_enforced() {
        let mut ledger = MemoryLedger::new();
        let mut tx = TxContext::new(&ledger);
        tx.put_state("k", b"1".to_vec());
        tx.set_required_organizations("k", &["Org1MSP".to_string(), "Org2MSP".to_string()]);
        let rw_set = tx.into_rw_set();
        // No prior policy: creation needs no particular endorser.
        ledger.commit(rw_set, &orgs(&["Org1MSP"])).unwrap();

        let err = write(&mut ledger, "k", b"2", &["Org1MSP"]).unwrap_err();
        assert_eq!(
            err,
            LedgerError::EndorsementPolicyFailure {
                key: "k".into(),
                missing: vec!["Org2MSP".into()],
            }
        );
        assert_eq!(ledger.get_state("k").unwrap(), Some(b"1".to_vec()));

        write(&mut ledger, "k", b"2", &["Org1MSP", "Org2MSP"]).unwrap();
    }

    #[test]
    fn test_rejected_commit_leaves_no_trace() {
        let mut ledger = MemoryLedger::new();
        write(&mut ledger, "k", b"1", &[]).unwrap();
        let before = ledger.clone();

        let mut tx = TxContext::new(&ledger);
        tx.put_private("c", "p", b"secret".to_vec());
        tx.put_state("other", b"x".to_vec());
        let mut rw_set = tx.into_rw_set();
        rw_set.reads.insert("k".into(), 0);

        assert!(ledger.commit(rw_set, &BTreeSet::new()).is_err());
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_private_hash_hides_content() {
        let mut ledger = MemoryLedger::new();
        let mut tx = TxContext::new(&ledger);
        tx.put_private("_implicit_org_Org1MSP", "p", b"secret".to_vec());
        let rw_set = tx.into_rw_set();
        ledger.commit(rw_set, &BTreeSet::new()).unwrap();

        assert_eq!(
            ledger.get_private_hash("_implicit_org_Org1MSP", "p").unwrap(),
            Some(auction_crypto::bid_digest(b"secret"))
        );
        assert_eq!(ledger.get_private_hash("_implicit_org_Org2MSP", "p").unwrap(), None);
    }

    #[test]
    fn test_snapshot_json() {
        let mut ledger = MemoryLedger::new();
        write(&mut ledger, "k", b"1", &[]).unwrap();
        let json = serde_json::to_string(&ledger).unwrap();
        let restored: MemoryLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, ledger);
    }
}
