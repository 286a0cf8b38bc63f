//! Settlement for sealed-bid double auction sessions.
//!
//! Given the revealed bids of a session, computes one settlement status per
//! bid by greedily matching each bid against the aggregate volume of the
//! opposing side.
//!
//! The pass is a pure function of its ordered input: no maps with unspecified
//! iteration order, no clocks, no randomness. Every replica that re-executes
//! settlement therefore assigns identical labels.
//!
//! # Inputs
//! - entries[] in strictly ascending bid-key order (side, volume)
//!
//! # Outputs
//! - one status per entry (Approved, PartiallyApproved, NotApproved)
//! - per-side totals and residual counters

pub mod matching;

pub use matching::{clear, clear_revealed, match_against, ClearingError};
