//! Validation outcome reported by the validation collaborator
//!
//! The pipeline only reads `is_valid` and `confidence`; the rest travels into
//! the ledger report for audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of validating a prescription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,

    /// Validator confidence in [0, 1]
    pub confidence: f64,

    #[serde(default)]
    pub checks_performed: Vec<String>,

    #[serde(default)]
    pub errors: Vec<String>,

    #[serde(default)]
    pub warnings: Vec<String>,

    #[serde(default)]
    pub recommendations: Vec<String>,

    /// Name of the validator that produced this outcome
    pub validated_by: String,

    pub validated_at: DateTime<Utc>,
}

impl ValidationOutcome {
    /// A passing outcome with full confidence and no findings
    pub fn passed(validated_by: impl Into<String>, validated_at: DateTime<Utc>) -> Self {
        Self {
            is_valid: true,
            confidence: 1.0,
            checks_performed: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            recommendations: Vec::new(),
            validated_by: validated_by.into(),
            validated_at,
        }
    }

    /// A failing outcome with zero confidence
    pub fn failed(
        validated_by: impl Into<String>,
        errors: Vec<String>,
        validated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            is_valid: false,
            confidence: 0.0,
            errors,
            ..Self::passed(validated_by, validated_at)
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
