//! RxLedger Core - Domain types
//!
//! This crate contains the fundamental types used across RxLedger:
//! - `Prescription`: Typed prescription fields plus an open extension map
//! - `Submission`: A prescription stamped with an id and intake time
//! - `Dosage`: Numeric quantity parsed from free-text dosage instructions
//! - `SupplyDuration`: Days of supply parsed from a stated duration
//! - `ValidationOutcome`: What the validation collaborator reports
//! - `RiskAssessment`: Scored risk for one submission

pub mod dosage;
pub mod prescription;
pub mod risk;
pub mod supply;
pub mod validation;

pub use dosage::{Dosage, DosageError};
pub use prescription::{Extensions, Prescription, Submission, REQUIRED_FIELDS};
pub use risk::{RiskAssessment, RiskLevel, RiskSignals};
pub use supply::{SupplyDuration, SupplyError};
pub use validation::ValidationOutcome;
