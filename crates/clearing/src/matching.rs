//! Greedy two-sided volume matching.
//!
//! Each sell bid consumes the running buy total and each buy bid consumes the
//! running sell total, in input order:
//! - volume strictly below the remaining opposing volume: Approved
//! - otherwise, remaining opposing volume still nonzero: PartiallyApproved,
//!   and the opposing counter drops to zero
//! - opposing counter already zero: NotApproved

use std::collections::BTreeMap;

use thiserror::Error;

use auction_types::clearing_io::{BidOutcome, ClearingInput, ClearingOutput};
use auction_types::{BidKey, BidSide, RevealedBid, SettlementStatus};

/// Errors that can occur during clearing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClearingError {
    #[error("Invalid clearing input: {0}")]
    InvalidInput(&'static str),

    #[error("Bid {0} already carries a settlement status")]
    AlreadySettled(BidKey),
}

/// Match one bid of `volume` against the remaining opposing volume.
///
/// Returns the status and the opposing volume actually consumed.
pub fn match_against(volume: u64, remaining: &mut u128) -> (SettlementStatus, u64) {
    let wanted = u128::from(volume);
    if wanted < *remaining {
        *remaining -= wanted;
        (SettlementStatus::Approved, volume)
    } else if *remaining > 0 {
        // remaining <= volume here, so it fits in u64
        let consumed = u64::try_from(*remaining).unwrap_or(volume);
        *remaining = 0;
        (SettlementStatus::PartiallyApproved, consumed)
    } else {
        (SettlementStatus::NotApproved, 0)
    }
}

/// Run one clearing pass over an ordered input.
pub fn clear(input: &ClearingInput) -> Result<ClearingOutput, ClearingError> {
    input.validate().map_err(ClearingError::InvalidInput)?;

    let total_buy = input.total(BidSide::Buy);
    let total_sell = input.total(BidSide::Sell);

    let mut remaining_buy = total_buy;
    let mut remaining_sell = total_sell;

    let outcomes = input
        .entries
        .iter()
        .map(|entry| {
            let counter = match entry.side {
                BidSide::Sell => &mut remaining_buy,
                BidSide::Buy => &mut remaining_sell,
            };
            let (status, matched) = match_against(entry.volume, counter);
            BidOutcome {
                bid_key: entry.bid_key.clone(),
                side: entry.side,
                volume: entry.volume,
                status,
                matched,
            }
        })
        .collect();

    Ok(ClearingOutput {
        outcomes,
        total_buy,
        total_sell,
        residual_buy: remaining_buy,
        residual_sell: remaining_sell,
    })
}

/// Clear a session's revealed bids in ascending bid-key order.
///
/// Every bid must still be `Finalized`; statuses are assigned exactly once.
pub fn clear_revealed(
    revealed: &BTreeMap<BidKey, RevealedBid>,
) -> Result<ClearingOutput, ClearingError> {
    if let Some((key, _)) = revealed.iter().find(|(_, bid)| bid.status.is_settled()) {
        return Err(ClearingError::AlreadySettled(key.clone()));
    }
    clear(&ClearingInput::from_revealed(revealed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_types::clearing_io::ClearingEntry;
    use proptest::prelude::*;

    fn entry(submission: &str, side: BidSide, volume: u64) -> ClearingEntry {
        ClearingEntry {
            bid_key: BidKey::new("s1", submission).unwrap(),
            side,
            volume,
        }
    }

    fn statuses(output: &ClearingOutput) -> Vec<SettlementStatus> {
        output.outcomes.iter().map(|o| o.status).collect()
    }

    #[test]
    fn test_mixed_sides_scenario() {
        // S1=50, S2=30, B1=40 processed in that order
        let input = ClearingInput {
            entries: vec![
                entry("a", BidSide::Sell, 50),
                entry("b", BidSide::Sell, 30),
                entry("c", BidSide::Buy, 40),
            ],
        };
        let output = clear(&input).unwrap();

        assert_eq!(output.total_buy, 40);
        assert_eq!(output.total_sell, 80);
        assert_eq!(
            statuses(&output),
            vec![
                SettlementStatus::PartiallyApproved,
                SettlementStatus::NotApproved,
                SettlementStatus::Approved,
            ]
        );
        assert_eq!(output.residual_buy, 0);
        assert_eq!(output.residual_sell, 40);
        assert_eq!(output.outcomes[0].matched, 40);
    }

    #[test]
    fn test_equal_volume_is_partial() {
        // A bid exactly equal to the remaining volume is not strictly smaller.
        let input = ClearingInput {
            entries: vec![entry("a", BidSide::Sell, 40), entry("b", BidSide::Buy, 40)],
        };
        let output = clear(&input).unwrap();
        assert_eq!(
            statuses(&output),
            vec![
                SettlementStatus::PartiallyApproved,
                SettlementStatus::PartiallyApproved
            ]
        );
        assert_eq!(output.outcomes[0].matched, 40);
    }

    #[test]
    fn test_one_sided_session_clears_nothing() {
        let input = ClearingInput {
            entries: vec![entry("a", BidSide::Buy, 10), entry("b", BidSide::Buy, 20)],
        };
        let output = clear(&input).unwrap();
        assert_eq!(
            statuses(&output),
            vec![SettlementStatus::NotApproved, SettlementStatus::NotApproved]
        );
        assert_eq!(output.matched_volume(BidSide::Buy), 0);
    }

    #[test]
    fn test_zero_volume_bid() {
        let input = ClearingInput {
            entries: vec![
                entry("a", BidSide::Sell, 0),
                entry("b", BidSide::Buy, 5),
                entry("c", BidSide::Sell, 0),
            ],
        };
        let output = clear(&input).unwrap();
        // total_sell is 0, so the buy bid finds nothing to match.
        assert_eq!(
            statuses(&output),
            vec![
                SettlementStatus::Approved,
                SettlementStatus::NotApproved,
                SettlementStatus::Approved,
            ]
        );
    }

    #[test]
    fn test_order_changes_outcome() {
        let forward = ClearingInput {
            entries: vec![
                entry("a", BidSide::Sell, 30),
                entry("b", BidSide::Sell, 50),
                entry("c", BidSide::Buy, 40),
            ],
        };
        let output = clear(&forward).unwrap();
        assert_eq!(output.outcomes[0].status, SettlementStatus::Approved);
        assert_eq!(output.outcomes[1].status, SettlementStatus::PartiallyApproved);
        assert_eq!(output.outcomes[1].matched, 10);
    }

    #[test]
    fn test_rejects_unordered_input() {
        let input = ClearingInput {
            entries: vec![entry("b", BidSide::Sell, 1), entry("a", BidSide::Buy, 1)],
        };
        assert!(matches!(clear(&input), Err(ClearingError::InvalidInput(_))));
        assert!(matches!(
            clear(&ClearingInput::default()),
            Err(ClearingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_clear_revealed_rejects_settled_bids() {
        let key = BidKey::new("s1", "a").unwrap();
        let mut revealed = BTreeMap::new();
        revealed.insert(
            key.clone(),
            RevealedBid {
                bid_type: BidSide::Buy,
                volume: 1,
                org: "Org1MSP".into(),
                bidder: "alice".into(),
                status: SettlementStatus::Approved,
            },
        );
        assert_eq!(
            clear_revealed(&revealed),
            Err(ClearingError::AlreadySettled(key))
        );
    }

    #[test]
    fn test_clearing_is_deterministic() {
        let input = ClearingInput {
            entries: (0..20)
                .map(|i| {
                    let side = if i % 3 == 0 { BidSide::Buy } else { BidSide::Sell };
                    entry(&format!("tx-{i:02}"), side, (i * 7 % 11) as u64)
                })
                .collect(),
        };
        assert_eq!(clear(&input).unwrap(), clear(&input).unwrap());
    }

    fn arb_entries() -> impl Strategy<Value = Vec<ClearingEntry>> {
        prop::collection::vec((any::<bool>(), 0u64..1_000), 1..40).prop_map(|bids| {
            bids.into_iter()
                .enumerate()
                .map(|(i, (is_buy, volume))| {
                    let side = if is_buy { BidSide::Buy } else { BidSide::Sell };
                    entry(&format!("tx-{i:04}"), side, volume)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_matched_volume_never_exceeds_opposing_total(entries in arb_entries()) {
            let output = clear(&ClearingInput { entries }).unwrap();

            prop_assert!(output.matched_volume(BidSide::Sell) <= output.total_buy);
            prop_assert!(output.matched_volume(BidSide::Buy) <= output.total_sell);
            prop_assert_eq!(
                output.matched_volume(BidSide::Sell) + output.residual_buy,
                output.total_buy
            );
            prop_assert_eq!(
                output.matched_volume(BidSide::Buy) + output.residual_sell,
                output.total_sell
            );
        }

        #[test]
        fn prop_at_most_one_partial_per_side(entries in arb_entries()) {
            let output = clear(&ClearingInput { entries }).unwrap();
            for side in [BidSide::Buy, BidSide::Sell] {
                prop_assert!(output.count(side, SettlementStatus::PartiallyApproved) <= 1);
            }
        }

        #[test]
        fn prop_every_bid_gets_a_final_label(entries in arb_entries()) {
            let output = clear(&ClearingInput { entries: entries.clone() }).unwrap();
            prop_assert_eq!(output.outcomes.len(), entries.len());
            prop_assert!(output.outcomes.iter().all(|o| o.status.is_settled()));
        }
    }
}
