//! RxLedger Review - Priority queue for flagged prescriptions
//!
//! Flagged submissions wait here for a human decision. Items are served by
//! (tier, enqueue time), carry an SLA deadline, and are promoted by the
//! escalation sweep as time passes.
//!
//! # Lifecycle
//! ```text
//! Pending -> UnderReview -> Approved
//!                        -> Rejected
//! ```
//! A terminal decision moves the item into the archive, where only notes
//! may still be appended.

pub mod config;
pub mod error;
pub mod escalation;
pub mod item;
pub mod queue;

pub use config::ReviewConfig;
pub use error::{ReviewError, ReviewResult};
pub use escalation::{EscalationEngine, EscalationEvent, EscalationRule, RuleAction, RuleCondition};
pub use item::{EscalationEntry, ItemId, QueueItem, ReviewDecision, ReviewNote, ReviewState, Tier};
pub use queue::{QueueStatus, ReviewQueue};
