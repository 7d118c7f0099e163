//! RxLedger Ledger - Append-only, hash-linked prescription records
//!
//! Every accepted prescription ends up here. Nothing is ever mutated or
//! removed; tampering is detected by recomputing hashes along the chain.
//!
//! # Key Types
//! - `Record`: One immutable ledger entry
//! - `RecordPayload`: Genesis marker or the accepted submission
//! - `RecordReport`: Validation and risk results attached to a record
//! - `Ledger`: The chain itself, owning append, verification and queries

pub mod chain;
pub mod error;
pub mod hash;
pub mod record;
pub mod stats;

pub use chain::Ledger;
pub use error::{LedgerError, LedgerResult};
pub use hash::{calculate_record_hash, verify_chain, ChainError};
pub use record::{
    Record, RecordPayload, RecordReport, RecordStatus, GENESIS_PREV_HASH, WARNING_MARKER_KEY,
};
pub use stats::LedgerStats;
