//! Risk assessment types
//!
//! Produced once per submission by the scorer and embedded into either a
//! ledger record report or a review queue item. Never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of the Low band (inclusive)
pub const LOW_MAX: f64 = 30.0;
/// Upper bound of the Moderate band (inclusive)
pub const MODERATE_MAX: f64 = 60.0;

/// Discrete risk level derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// 0-30
    Low,
    /// 31-60
    Moderate,
    /// 61-100
    High,
}

impl RiskLevel {
    /// Map a clamped score onto its band
    pub fn from_score(score: f64) -> Self {
        if score <= LOW_MAX {
            RiskLevel::Low
        } else if score <= MODERATE_MAX {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-signal sub-scores, each in [0, 100] before weighting
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskSignals {
    pub frequency: f64,
    pub prescribers: f64,
    pub dosage_escalation: f64,
    pub early_repeat: f64,
    pub high_sensitivity: f64,
}

/// Scored risk assessment for one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Weighted score, clamped to [0, 100]
    pub score: f64,
    pub level: RiskLevel,
    pub signals: RiskSignals,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl RiskAssessment {
    /// Build an assessment; the score is clamped and the level derived from it
    pub fn new(
        score: f64,
        signals: RiskSignals,
        factors: Vec<String>,
        recommendations: Vec<String>,
        analyzed_at: DateTime<Utc>,
    ) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 100.0) };
        Self {
            score,
            level: RiskLevel::from_score(score),
            signals,
            factors,
            recommendations,
            analyzed_at,
        }
    }

    pub fn is_high(&self) -> bool {
        self.level == RiskLevel::High
    }
}
