//! Replicated sealed-bid double auction sessions.
//!
//! This module implements the session state machine every replica executes:
//!
//! - Session creation with the creator as admin
//! - Private bid storage in the bidder's organization partition
//! - Hash commitments recorded in the public session record
//! - Verified reveals after the admin closes bidding
//! - Deterministic settlement when the admin ends the session
//! - Endorsement policies that grow with each participating organization
//!
//! # Architecture
//!
//! - `call`: Message types for state-changing operations
//! - `handlers`: Business logic for processing calls
//! - `lifecycle`: Session snapshot transitions
//! - `reveal`: Reveal verification
//! - `queries`: Read-only state access
//! - `ledger`: Ledger contract and per-call read/write sets
//! - `state`: In-memory ledger
//! - `context`: Per-call runtime context
//! - `genesis`: Initial configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```ignore
//! use auction_module::{CallContext, SessionCall, SessionModule, MemoryLedger};
//! use auction_types::AssetKind;
//!
//! let module = SessionModule::new(AssetKind::Session, Default::default())?;
//! let mut ledger = MemoryLedger::new();
//! let ctx = CallContext::new("admin", "Org1MSP", "tx0");
//!
//! // Create a session
//! module.execute(&mut ledger, &ctx, &SessionCall::CreateSession { session_id: "s1".into() })?;
//! ```

pub mod call;
pub mod context;
pub mod error;
pub mod genesis;
pub mod handlers;
pub mod ledger;
pub mod lifecycle;
pub mod queries;
pub mod reveal;
pub mod state;

pub use call::{CallResponse, SessionCall};
pub use context::CallContext;
pub use error::{ErrorKind, LedgerError, SessionError};
pub use genesis::{GenesisValidationError, ModuleGenesisConfig};
pub use handlers::{HandlerResult, SessionModule, Simulation};
pub use ledger::{Ledger, ReadWriteSet, TxContext, Version};
pub use queries::{PrivateBid, SessionQuery, SessionQueryResponse, SettlementSummary, SideSummary};
pub use state::MemoryLedger;
