//! Ledger Record - one immutable, hash-linked entry

use chrono::{DateTime, Utc};
use rxledger_core::{Extensions, Prescription, RiskAssessment, Submission, ValidationOutcome};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::LedgerResult;
use crate::hash::calculate_record_hash;

/// previous_hash of the genesis record
pub const GENESIS_PREV_HASH: &str = "0";

/// Extension key carrying the warning marker on AcceptWithWarning records
pub const WARNING_MARKER_KEY: &str = "risk_warning";

/// How a record came to be in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// First record of every chain
    Genesis,
    /// Routed as Accept
    Accepted,
    /// Routed as AcceptWithWarning
    AcceptedWithWarning,
}

/// What a record carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordPayload {
    Genesis,
    Prescription(Submission),
}

/// Validation and risk results stored alongside the payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordReport {
    pub status: RecordStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationOutcome>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAssessment>,

    /// Variable metadata, e.g. the warning marker
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
}

impl RecordReport {
    /// Report for the genesis record
    pub fn genesis() -> Self {
        Self {
            status: RecordStatus::Genesis,
            validation: None,
            risk: None,
            extensions: Extensions::new(),
        }
    }

    /// Report for a plainly accepted submission
    pub fn accepted(validation: ValidationOutcome, risk: RiskAssessment) -> Self {
        Self {
            status: RecordStatus::Accepted,
            validation: Some(validation),
            risk: Some(risk),
            extensions: Extensions::new(),
        }
    }

    /// Report for a submission accepted with a risk warning
    ///
    /// The warning marker is embedded in the extension map.
    pub fn accepted_with_warning(validation: ValidationOutcome, risk: RiskAssessment) -> Self {
        let mut extensions = Extensions::new();
        extensions.insert(
            WARNING_MARKER_KEY.to_string(),
            serde_json::json!({
                "level": risk.level,
                "score": risk.score,
                "factors": risk.factors,
            }),
        );
        Self {
            status: RecordStatus::AcceptedWithWarning,
            validation: Some(validation),
            risk: Some(risk),
            extensions,
        }
    }

    pub fn has_warning(&self) -> bool {
        self.extensions.contains_key(WARNING_MARKER_KEY)
    }
}

/// One ledger entry
///
/// # Invariant
/// `hash == calculate_record_hash(index, timestamp, payload, report, previous_hash)`
/// and `previous_hash` equals the hash of the record at `index - 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Zero-based position in the chain
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: RecordPayload,
    pub report: RecordReport,
    pub previous_hash: String,
    pub hash: String,
}

impl Record {
    /// Build a record and seal it with its content hash
    pub fn seal(
        index: u64,
        timestamp: DateTime<Utc>,
        payload: RecordPayload,
        report: RecordReport,
        previous_hash: String,
    ) -> LedgerResult<Self> {
        let hash = calculate_record_hash(index, &timestamp, &payload, &report, &previous_hash)?;
        Ok(Self {
            index,
            timestamp,
            payload,
            report,
            previous_hash,
            hash,
        })
    }

    /// Recompute the hash from the stored fields
    pub fn compute_hash(&self) -> LedgerResult<String> {
        calculate_record_hash(
            self.index,
            &self.timestamp,
            &self.payload,
            &self.report,
            &self.previous_hash,
        )
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self.payload, RecordPayload::Genesis)
    }

    /// The accepted submission, if this is not the genesis record
    pub fn submission(&self) -> Option<&Submission> {
        match &self.payload {
            RecordPayload::Prescription(submission) => Some(submission),
            RecordPayload::Genesis => None,
        }
    }

    pub fn prescription(&self) -> Option<&Prescription> {
        self.submission().map(|s| &s.prescription)
    }
}
