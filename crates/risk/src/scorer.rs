//! Risk Scorer - weighted sum of the five signals

use rxledger_core::{RiskAssessment, RiskLevel, RiskSignals, Submission};
use rxledger_ledger::Record;
use tracing::debug;

use crate::config::RiskConfig;
use crate::signals::{self, SignalScore};

/// Scores submissions against prior history
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    config: RiskConfig,
}

impl RiskScorer {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Assess a submission against prior records
    ///
    /// Records for other subjects, the genesis record and records stamped
    /// after the submission are ignored, so callers may pass the whole chain.
    /// The submission's own `submitted_at` is both the window reference and
    /// the analysis timestamp.
    pub fn assess(&self, history: &[Record], submission: &Submission) -> RiskAssessment {
        let reference = submission.submitted_at;
        let current = &submission.prescription;

        let prior: Vec<Record> = match submission.subject() {
            Some(subject) => history
                .iter()
                .filter(|r| r.timestamp <= reference)
                .filter(|r| {
                    r.prescription()
                        .and_then(|p| p.patient_id.as_deref())
                        .map_or(false, |id| id == subject)
                })
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        let frequency = signals::frequency(&self.config, &prior, reference);
        let prescribers = signals::prescribers(&self.config, &prior, current);
        let dosage = signals::dosage_escalation(&self.config, &prior, current);
        let early = signals::early_repeat(&self.config, &prior, current, reference);
        let sensitivity = signals::high_sensitivity(&self.config, current);

        let weights = &self.config.weights;
        let score = frequency.score * weights.frequency
            + prescribers.score * weights.prescribers
            + dosage.score * weights.dosage_escalation
            + early.score * weights.early_repeat
            + sensitivity.score * weights.high_sensitivity;

        let signal_scores = RiskSignals {
            frequency: frequency.score,
            prescribers: prescribers.score,
            dosage_escalation: dosage.score,
            early_repeat: early.score,
            high_sensitivity: sensitivity.score,
        };

        let factors: Vec<String> = [frequency, prescribers, dosage, early, sensitivity]
            .into_iter()
            .filter_map(|s: SignalScore| s.factor)
            .collect();

        let level = RiskLevel::from_score(score.clamp(0.0, 100.0));
        let assessment = RiskAssessment::new(
            score,
            signal_scores,
            factors,
            recommendations(level),
            reference,
        );

        debug!(
            submission_id = %submission.id,
            prior_records = prior.len(),
            score = assessment.score,
            level = %assessment.level,
            "Risk assessed"
        );

        assessment
    }
}

/// Recommendations for a risk level, most urgent first
pub fn recommendations(level: RiskLevel) -> Vec<String> {
    let items: &[&str] = match level {
        RiskLevel::High => &[
            "Escalate to a pharmacist for immediate review",
            "Verify the prescription directly with the prescriber before dispensing",
            "Check the prescription drug monitoring program for recent fills",
        ],
        RiskLevel::Moderate => &[
            "Apply enhanced monitoring to this patient",
            "Review recent prescription history at next dispense",
        ],
        RiskLevel::Low => &["Routine processing"],
    };
    items.iter().map(|s| s.to_string()).collect()
}
