//! RxLedger Risk - Misuse risk scoring
//!
//! Scores a candidate submission against the subject's prior ledger history.
//! The scorer is a pure function of its inputs: no clock, no I/O.
//!
//! # Signals
//! - Frequency: same-subject prescriptions in the trailing window
//! - Prescribers: distinct doctors for the same medication
//! - Dosage escalation: current dose against the historical mean
//! - Early repeat: refill before the previous supply ran out
//! - High sensitivity: controlled medication categories

pub mod config;
pub mod scorer;
pub mod signals;

pub use config::{Band, RiskConfig, SignalWeights};
pub use scorer::RiskScorer;
pub use signals::SignalScore;
