//! RxLedger RPC - Decision pipeline orchestrator
//!
//! This crate wires the ledger, scorer, review queue and collaborators into
//! one `AppContext`, and provides the CLI binary.

pub mod commands;
pub mod config;
pub mod context;
pub mod router;
pub mod worker;

pub use config::{AppConfig, ConfigError};
pub use context::{AppContext, MetricsSnapshot, PipelineError, SubmissionOutcome, SubmissionResult, SweepReport};
pub use router::{route, Decision};
pub use worker::EscalationWorker;
