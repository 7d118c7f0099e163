//! Rule-based prescription validator
//!
//! Checks, in order:
//! 1. Required fields present
//! 2. Dosage contains a quantity
//! 3. Known drug interactions
//! 4. Pediatric / geriatric patient
//! 5. Supply duration follow-up
//!
//! General safety recommendations are always attached.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rxledger_core::{Prescription, Submission, ValidationOutcome};

use crate::error::HookResult;
use crate::traits::PrescriptionValidator;

const VALIDATOR_NAME: &str = "Rule-based Prescription Validator v1.0";

const CONFIDENCE_CLEAN: f64 = 0.95;
const CONFIDENCE_WITH_WARNINGS: f64 = 0.75;

const PEDIATRIC_BELOW: u32 = 18;
const GERIATRIC_ABOVE: u32 = 65;

/// Drug (or class) and what it must not be combined with
const DRUG_INTERACTIONS: &[(&str, &[&str])] = &[
    ("Warfarin", &["Aspirin", "Ibuprofen", "NSAIDs"]),
    ("MAOIs", &["SSRIs", "Tyramine-rich foods"]),
    ("Metformin", &["Alcohol", "Iodinated contrast"]),
    ("Statins", &["Grapefruit juice", "Fibrates"]),
    ("ACE Inhibitors", &["Potassium supplements", "NSAIDs"]),
    ("Digoxin", &["Diuretics", "Calcium channel blockers"]),
];

const GENERAL_RECOMMENDATIONS: &[&str] = &[
    "Verify patient allergy history before dispensing",
    "Confirm patient identification at pickup",
    "Provide patient counseling on proper medication use",
];

/// Default validation collaborator
#[derive(Debug, Clone, Default)]
pub struct RuleBasedValidator;

impl RuleBasedValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a prescription at an explicit time
    pub fn check(&self, prescription: &Prescription, now: DateTime<Utc>) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::passed(VALIDATOR_NAME, now);

        // Check 1: required fields
        let missing = prescription.missing_fields();
        if missing.is_empty() {
            outcome.checks_performed.push("All required fields present".to_string());
        } else {
            outcome.is_valid = false;
            outcome
                .errors
                .push(format!("Missing required fields: {}", missing.join(", ")));
            outcome.checks_performed.push("Required fields check FAILED".to_string());
        }

        // Check 2: dosage format
        if let Some(ref dosage) = prescription.dosage {
            if dosage.chars().any(|c| c.is_ascii_digit()) {
                outcome
                    .checks_performed
                    .push(format!("Dosage format valid: {}", dosage));
            } else {
                outcome
                    .warnings
                    .push("Dosage format unclear - verify with prescribing physician".to_string());
                outcome
                    .checks_performed
                    .push("Dosage format needs verification".to_string());
            }
        }

        // Check 3: interactions
        if let Some(ref medication) = prescription.medication {
            let medication = medication.to_lowercase();
            let mut found = 0;
            for (drug, interactions) in DRUG_INTERACTIONS {
                if medication.contains(&drug.to_lowercase()) {
                    found += 1;
                    outcome.warnings.push(format!(
                        "INTERACTION ALERT: {} - verify no concurrent use of {}",
                        drug,
                        interactions.join(", ")
                    ));
                }
            }
            if found > 0 {
                outcome
                    .checks_performed
                    .push(format!("Found {} potential interaction(s)", found));
            } else {
                outcome
                    .checks_performed
                    .push("No known drug interactions detected".to_string());
            }
        }

        // Check 4: age
        match prescription.patient_age {
            Some(age) if age < PEDIATRIC_BELOW => outcome
                .warnings
                .push("Pediatric patient - verify dosage is age-appropriate".to_string()),
            Some(age) if age > GERIATRIC_ABOVE => outcome.warnings.push(
                "Geriatric patient - monitor for adverse effects and adjust dosage if needed"
                    .to_string(),
            ),
            _ => {}
        }

        // Check 5: duration
        if let Some(ref duration) = prescription.duration {
            if duration.contains("30") || duration.to_lowercase().contains("month") {
                outcome
                    .recommendations
                    .push("Standard 30-day supply - schedule follow-up appointment".to_string());
            } else if duration.contains("90") {
                outcome
                    .recommendations
                    .push("Extended 90-day supply - ensure patient has stable condition".to_string());
            }
        }

        outcome
            .recommendations
            .extend(GENERAL_RECOMMENDATIONS.iter().map(|s| s.to_string()));

        outcome.confidence = if !outcome.is_valid {
            0.0
        } else if outcome.has_warnings() {
            CONFIDENCE_WITH_WARNINGS
        } else {
            CONFIDENCE_CLEAN
        };

        outcome
    }
}

#[async_trait]
impl PrescriptionValidator for RuleBasedValidator {
    fn name(&self) -> &str {
        VALIDATOR_NAME
    }

    async fn validate(&self, submission: &Submission) -> HookResult<ValidationOutcome> {
        Ok(self.check(&submission.prescription, submission.submitted_at))
    }
}
