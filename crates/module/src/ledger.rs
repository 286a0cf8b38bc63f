//! Ledger collaborator contract and per-call simulation view.
//!
//! A call is executed in two phases. During simulation a handler reads
//! committed state through a [`TxContext`], which records the version of
//! every public key read and buffers every write. The resulting
//! [`ReadWriteSet`] is then handed to [`Ledger::commit`], which validates it
//! and applies all writes at once or none at all.

use std::collections::{BTreeMap, BTreeSet};

use auction_types::{BidDigest, OrgId};

use crate::error::LedgerError;

/// Monotonic per-key version; 0 means the key has never been written.
pub type Version = u64;

/// Committed state accessible to the session module.
pub trait Ledger {
    /// Public world-state value.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Current version of a public key.
    fn version(&self, key: &str) -> Version;

    /// Private content; only meaningful on a replica of the owning org.
    fn get_private(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Hash of private content, visible without exposing the content.
    fn get_private_hash(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<BidDigest>, LedgerError>;

    /// Organizations that must endorse any mutation of `key`.
    fn required_organizations(&self, key: &str) -> Result<Option<Vec<OrgId>>, LedgerError>;

    /// Validate and apply a simulated write set atomically.
    fn commit(
        &mut self,
        rw_set: ReadWriteSet,
        endorsers: &BTreeSet<OrgId>,
    ) -> Result<(), LedgerError>;
}

/// Reads and buffered writes produced by simulating one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadWriteSet {
    /// Public keys read, with the version observed
    pub reads: BTreeMap<String, Version>,
    /// Public writes; the last write to a key wins
    pub writes: BTreeMap<String, Vec<u8>>,
    /// Private writes keyed by (collection, key)
    pub private_writes: BTreeMap<(String, String), Vec<u8>>,
    /// Replacement endorsement policies
    pub endorsement_updates: BTreeMap<String, Vec<OrgId>>,
}

impl ReadWriteSet {
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty() && self.private_writes.is_empty() && self.endorsement_updates.is_empty()
    }

    /// Public keys whose mutation is subject to endorsement.
    pub fn mutated_keys(&self) -> BTreeSet<&str> {
        self.writes
            .keys()
            .chain(self.endorsement_updates.keys())
            .map(String::as_str)
            .collect()
    }
}

/// Simulation view over committed state with read-your-own-writes.
pub struct TxContext<'a, L: Ledger + ?Sized> {
    ledger: &'a L,
    rw_set: ReadWriteSet,
}

impl<'a, L: Ledger + ?Sized> TxContext<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self {
            ledger,
            rw_set: ReadWriteSet::default(),
        }
    }

    /// Read a public key, recording its committed version.
    pub fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        if let Some(pending) = self.rw_set.writes.get(key) {
            return Ok(Some(pending.clone()));
        }
        self.rw_set
            .reads
            .entry(key.to_string())
            .or_insert_with(|| self.ledger.version(key));
        self.ledger.get_state(key)
    }

    pub fn put_state(&mut self, key: &str, value: Vec<u8>) {
        self.rw_set.writes.insert(key.to_string(), value);
    }

    pub fn put_private(&mut self, collection: &str, key: &str, value: Vec<u8>) {
        self.rw_set
            .private_writes
            .insert((collection.to_string(), key.to_string()), value);
    }

    pub fn get_private(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        match self.pending_private(collection, key) {
            Some(pending) => Ok(Some(pending.to_vec())),
            None => self.ledger.get_private(collection, key),
        }
    }

    pub fn get_private_hash(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<BidDigest>, LedgerError> {
        match self.pending_private(collection, key) {
            Some(pending) => Ok(Some(auction_crypto::bid_digest(pending))),
            None => self.ledger.get_private_hash(collection, key),
        }
    }

    /// Replace the endorsement policy of `key`.
    pub fn set_required_organizations(&mut self, key: &str, orgs: &[OrgId]) {
        let mut policy: Vec<OrgId> = Vec::with_capacity(orgs.len());
        for org in orgs {
            if !policy.contains(org) {
                policy.push(org.clone());
            }
        }
        self.rw_set
            .endorsement_updates
            .insert(key.to_string(), policy);
    }

    /// Extend the endorsement policy of `key` with one more organization.
    pub fn add_required_organization(&mut self, key: &str, org: &str) -> Result<(), LedgerError> {
        let mut policy = match self.rw_set.endorsement_updates.get(key) {
            Some(pending) => pending.clone(),
            None => self.ledger.required_organizations(key)?.unwrap_or_default(),
        };
        if !policy.iter().any(|o| o == org) {
            policy.push(org.to_string());
        }
        self.rw_set
            .endorsement_updates
            .insert(key.to_string(), policy);
        Ok(())
    }

    pub fn rw_set(&self) -> &ReadWriteSet {
        &self.rw_set
    }

    pub fn into_rw_set(self) -> ReadWriteSet {
        self.rw_set
    }

    fn pending_private(&self, collection: &str, key: &str) -> Option<&[u8]> {
        self.rw_set
            .private_writes
            .get(&(collection.to_string(), key.to_string()))
            .map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryLedger;

    #[test]
    fn test_reads_record_committed_version() {
        let mut ledger = MemoryLedger::new();
        let mut seed = TxContext::new(&ledger);
        seed.put_state("k", b"v1".to_vec());
        let rw_set = seed.into_rw_set();
        ledger.commit(rw_set, &BTreeSet::new()).unwrap();

        let mut tx = TxContext::new(&ledger);
        assert_eq!(tx.get_state("k").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(tx.get_state("missing").unwrap(), None);
        assert_eq!(tx.rw_set().reads.get("k"), Some(&1));
        assert_eq!(tx.rw_set().reads.get("missing"), Some(&0));
    }

    #[test]
    fn test_read_your_own_writes() {
        let ledger = MemoryLedger::new();
        let mut tx = TxContext::new(&ledger);
        tx.put_state("k", b"pending".to_vec());
        assert_eq!(tx.get_state("k").unwrap(), Some(b"pending".to_vec()));
        // A key only written is not part of the read set.
        assert!(tx.rw_set().reads.is_empty());

        tx.put_private("c", "p", b"secret".to_vec());
        assert_eq!(tx.get_private("c", "p").unwrap(), Some(b"secret".to_vec()));
        assert_eq!(
            tx.get_private_hash("c", "p").unwrap(),
            Some(auction_crypto::bid_digest(b"secret"))
        );
    }

    #[test]
    fn test_endorsement_updates_accumulate() {
        let ledger = MemoryLedger::new();
        let mut tx = TxContext::new(&ledger);
        tx.set_required_organizations("k", &["Org1MSP".to_string(), "Org1MSP".to_string()]);
        tx.add_required_organization("k", "Org2MSP").unwrap();
        tx.add_required_organization("k", "Org2MSP").unwrap();
        assert_eq!(
            tx.rw_set().endorsement_updates.get("k"),
            Some(&vec!["Org1MSP".to_string(), "Org2MSP".to_string()])
        );
        assert!(!tx.rw_set().is_read_only());
    }
}
