//! Client SDK for sealed-bid auction sessions.
//!
//! This crate provides a high-level API for:
//! - Preparing salted plaintext bids and their commitment digests
//! - Driving the session lifecycle as one organization's member
//! - Recovering one's own stored bid for reveal
//! - Persisting a local ledger snapshot between CLI invocations

pub mod bid;
pub mod session;
pub mod store;

pub use bid::{create_bid, BidBuilder, BidError, PreparedBid};
pub use session::{new_submission_id, ClientError, ClientResult, Identity, SessionClient};
pub use store::{load_config, load_ledger, save_ledger, StoreError};
