//! Clearing I/O records.
//!
//! The clearer consumes an ordered list of revealed bids and produces one
//! outcome per bid in the same order.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{BidKey, BidSide, RevealedBid, SettlementStatus};

/// One revealed bid as seen by the clearer.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct ClearingEntry {
    pub bid_key: BidKey,
    pub side: BidSide,
    pub volume: u64,
}

/// Input to the clearer, in processing order.
#[derive(Clone, Debug, Default, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct ClearingInput {
    pub entries: Vec<ClearingEntry>,
}

impl ClearingInput {
    /// Build the input from a session's revealed bids, in ascending bid-key order.
    pub fn from_revealed(revealed: &BTreeMap<BidKey, RevealedBid>) -> Self {
        let entries = revealed
            .iter()
            .map(|(key, bid)| ClearingEntry {
                bid_key: key.clone(),
                side: bid.bid_type,
                volume: bid.volume,
            })
            .collect();
        Self { entries }
    }

    /// Sum of volumes on one side.
    pub fn total(&self, side: BidSide) -> u128 {
        self.entries
            .iter()
            .filter(|e| e.side == side)
            .map(|e| u128::from(e.volume))
            .sum()
    }

    /// Validate input consistency
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.entries.is_empty() {
            return Err("No entries to clear");
        }
        let ascending = self
            .entries
            .windows(2)
            .all(|pair| pair[0].bid_key < pair[1].bid_key);
        if !ascending {
            return Err("Entries must be in strictly ascending bid-key order");
        }
        Ok(())
    }
}

/// Settlement outcome for a single bid.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BidOutcome {
    pub bid_key: BidKey,
    pub side: BidSide,
    pub volume: u64,
    pub status: SettlementStatus,
    /// Opposing volume this bid consumed. Reported for auditing only; the
    /// session record keeps just the status label.
    pub matched: u64,
}

/// Output of one clearing pass.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct ClearingOutput {
    pub outcomes: Vec<BidOutcome>,
    pub total_buy: u128,
    pub total_sell: u128,
    /// Buy volume left unconsumed by sell bids
    pub residual_buy: u128,
    /// Sell volume left unconsumed by buy bids
    pub residual_sell: u128,
}

impl ClearingOutput {
    /// Opposing volume consumed by all bids on `side`.
    pub fn matched_volume(&self, side: BidSide) -> u128 {
        self.outcomes
            .iter()
            .filter(|o| o.side == side)
            .map(|o| u128::from(o.matched))
            .sum()
    }

    /// Number of bids on `side` with the given status.
    pub fn count(&self, side: BidSide, status: SettlementStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.side == side && o.status == status)
            .count()
    }
}
