//! Router - decision table over validation and risk

use rxledger_core::{RiskAssessment, RiskLevel, ValidationOutcome};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Routing outcome for a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Append to the ledger
    Accept,
    /// Append with a warning marker
    AcceptWithWarning,
    /// Hold for human review
    Flag,
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Decision::Flag)
    }
}

/// Route a scored submission
///
/// | validation | level    | decision          |
/// |------------|----------|-------------------|
/// | failed     | any      | Flag              |
/// | passed     | High     | Flag              |
/// | passed     | Moderate | AcceptWithWarning |
/// | passed     | Low      | Accept            |
pub fn route(validation: &ValidationOutcome, assessment: &RiskAssessment) -> Decision {
    if !validation.is_valid {
        return Decision::Flag;
    }
    match assessment.level {
        RiskLevel::High => Decision::Flag,
        RiskLevel::Moderate => Decision::AcceptWithWarning,
        RiskLevel::Low => Decision::Accept,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rxledger_core::RiskSignals;

    fn assessment(score: f64) -> RiskAssessment {
        RiskAssessment::new(score, RiskSignals::default(), vec![], vec![], Utc::now())
    }

    fn validation(valid: bool) -> ValidationOutcome {
        if valid {
            ValidationOutcome::passed("test", Utc::now())
        } else {
            ValidationOutcome::failed("test", vec!["missing".into()], Utc::now())
        }
    }

    #[test]
    fn test_decision_table() {
        for score in [0.0, 30.0, 45.0, 60.0, 61.0, 95.0] {
            assert_eq!(route(&validation(false), &assessment(score)), Decision::Flag);
        }
        assert_eq!(route(&validation(true), &assessment(0.0)), Decision::Accept);
        assert_eq!(route(&validation(true), &assessment(30.0)), Decision::Accept);
        assert_eq!(route(&validation(true), &assessment(31.0)), Decision::AcceptWithWarning);
        assert_eq!(route(&validation(true), &assessment(60.0)), Decision::AcceptWithWarning);
        assert_eq!(route(&validation(true), &assessment(61.0)), Decision::Flag);
    }

    #[test]
    fn test_low_confidence_does_not_flag() {
        let mut v = validation(true);
        v.confidence = 0.1;
        assert_eq!(route(&v, &assessment(5.0)), Decision::Accept);
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(Decision::AcceptWithWarning.to_string(), "accept_with_warning");
        assert!(Decision::AcceptWithWarning.is_accepted());
        assert!(!Decision::Flag.is_accepted());
    }
}
