//! Individual risk signals
//!
//! Each function inspects the subject's prior records and the candidate
//! prescription and returns a sub-score in [0, 100] plus, when nonzero, a
//! human-readable factor.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rxledger_core::{Dosage, Prescription, SupplyDuration};
use rxledger_ledger::Record;
use std::collections::BTreeSet;

use crate::config::{score_at_least, score_below, RiskConfig};

const SECONDS_PER_DAY: i64 = 86_400;

/// Sub-score for one signal
#[derive(Debug, Clone, PartialEq)]
pub struct SignalScore {
    pub score: f64,
    pub factor: Option<String>,
}

impl SignalScore {
    pub fn none() -> Self {
        Self {
            score: 0.0,
            factor: None,
        }
    }

    fn scored(score: f64, factor: impl FnOnce() -> String) -> Self {
        if score > 0.0 {
            Self {
                score,
                factor: Some(factor()),
            }
        } else {
            Self::none()
        }
    }
}

/// Prior records for the same medication, oldest first
fn same_medication<'a>(history: &'a [Record], current: &'a Prescription) -> impl Iterator<Item = &'a Record> {
    history
        .iter()
        .filter(move |r| r.prescription().map_or(false, |p| p.same_medication(current)))
}

/// Same-subject prescriptions inside the trailing window
pub fn frequency(config: &RiskConfig, history: &[Record], reference: DateTime<Utc>) -> SignalScore {
    let window_start = reference - config.window();
    let count = history
        .iter()
        .filter(|r| r.timestamp > window_start && r.timestamp <= reference)
        .count();

    let score = score_at_least(Decimal::from(count), &config.frequency_bands);
    SignalScore::scored(score, || {
        format!(
            "High prescription frequency: {} prescriptions in last {} days",
            count, config.window_days
        )
    })
}

/// Distinct prescribers for the same medication, current submission included
pub fn prescribers(config: &RiskConfig, history: &[Record], current: &Prescription) -> SignalScore {
    let mut doctors: BTreeSet<&str> = same_medication(history, current)
        .filter_map(|r| r.prescription().and_then(|p| p.doctor_id.as_deref()))
        .collect();
    if let Some(ref doctor) = current.doctor_id {
        doctors.insert(doctor.as_str());
    }

    let count = doctors.len();
    let score = score_at_least(Decimal::from(count), &config.prescriber_bands);
    SignalScore::scored(score, || {
        format!(
            "Multiple prescribers: {} doctors prescribing {}",
            count,
            current.medication.as_deref().unwrap_or("unknown")
        )
    })
}

/// Current dose against the mean of historical doses of the same medication
///
/// Doses whose unit differs from the current one are ignored. Returns zero
/// when there is no comparable history or the current dose cannot be read.
pub fn dosage_escalation(config: &RiskConfig, history: &[Record], current: &Prescription) -> SignalScore {
    let current_dose = match current.dosage.as_deref().map(str::parse::<Dosage>) {
        Some(Ok(dose)) => dose,
        _ => return SignalScore::none(),
    };

    let doses: Vec<Decimal> = same_medication(history, current)
        .filter_map(|r| r.prescription().and_then(|p| p.dosage.as_deref()))
        .filter_map(|d| d.parse::<Dosage>().ok())
        .filter(|d| match (&d.unit, &current_dose.unit) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        })
        .map(|d| d.quantity)
        .collect();

    if doses.is_empty() {
        return SignalScore::none();
    }

    // Historical doses too large to total are not comparable
    let total = match doses
        .iter()
        .try_fold(Decimal::ZERO, |acc, dose| acc.checked_add(*dose))
    {
        Some(total) => total,
        None => return SignalScore::none(),
    };
    let mean = total / Decimal::from(doses.len());
    if mean <= Decimal::ZERO {
        return SignalScore::none();
    }

    match current_dose.quantity.checked_div(mean) {
        Some(ratio) => {
            let score = score_at_least(ratio, &config.dosage_bands);
            SignalScore::scored(score, || {
                format!(
                    "Dosage escalation: {}x the average historical dose",
                    ratio.round_dp(2)
                )
            })
        }
        // Ratio beyond Decimal range sits above every band
        None => {
            let score = config
                .dosage_bands
                .iter()
                .map(|b| b.score)
                .fold(0.0, f64::max);
            SignalScore::scored(score, || {
                "Dosage escalation: far beyond the average historical dose".to_string()
            })
        }
    }
}

/// Refill requested before the previous supply of the same medication ran out
///
/// The expected interval is the stated duration of the latest prior record.
pub fn early_repeat(
    config: &RiskConfig,
    history: &[Record],
    current: &Prescription,
    reference: DateTime<Utc>,
) -> SignalScore {
    let latest = match same_medication(history, current)
        .filter(|r| r.timestamp <= reference)
        .max_by_key(|r| r.timestamp)
    {
        Some(record) => record,
        None => return SignalScore::none(),
    };

    let supply = match latest
        .prescription()
        .and_then(|p| p.duration.as_deref())
        .map(str::parse::<SupplyDuration>)
    {
        Some(Ok(supply)) => supply,
        _ => return SignalScore::none(),
    };

    let elapsed_seconds = (reference - latest.timestamp).num_seconds().max(0);
    let elapsed_days = Decimal::from(elapsed_seconds) / Decimal::from(SECONDS_PER_DAY);
    let ratio = elapsed_days / Decimal::from(supply.days());

    let score = score_below(ratio, &config.early_repeat_bands);
    SignalScore::scored(score, || {
        format!(
            "Early repeat: requested after {} of {} supplied days",
            elapsed_days.round_dp(1),
            supply.days()
        )
    })
}

/// Medication belongs to a high-sensitivity category
pub fn high_sensitivity(config: &RiskConfig, current: &Prescription) -> SignalScore {
    let medication = match current.medication.as_deref() {
        Some(m) if config.is_high_sensitivity(m) => m,
        _ => return SignalScore::none(),
    };

    SignalScore::scored(100.0, || {
        format!("High-sensitivity medication category: {}", medication)
    })
}
