//! Ledger statistics

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::record::Record;

/// Aggregate view over the accepted prescriptions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Records excluding genesis
    pub total_prescriptions: usize,
    pub unique_patients: usize,
    pub unique_prescribers: usize,
    pub unique_medications: usize,
    /// Most prescribed medication and its count; ties go to the one seen first
    pub most_prescribed: Option<(String, usize)>,
    pub chain_valid: bool,
}

impl LedgerStats {
    /// Compute statistics over a record slice
    pub fn collect(records: &[Record], chain_valid: bool) -> Self {
        let mut patients = HashSet::new();
        let mut prescribers = HashSet::new();
        // medication -> (count, first seen)
        let mut medications: HashMap<&str, (usize, usize)> = HashMap::new();
        let mut total = 0;

        for (position, prescription) in records.iter().filter_map(Record::prescription).enumerate() {
            total += 1;
            if let Some(ref id) = prescription.patient_id {
                patients.insert(id.as_str());
            }
            if let Some(ref id) = prescription.doctor_id {
                prescribers.insert(id.as_str());
            }
            if let Some(ref med) = prescription.medication {
                medications.entry(med.as_str()).or_insert((0, position)).0 += 1;
            }
        }

        let most_prescribed = medications
            .iter()
            .max_by(|a, b| {
                let (count_a, first_a) = a.1;
                let (count_b, first_b) = b.1;
                count_a.cmp(count_b).then(first_b.cmp(first_a))
            })
            .map(|(med, (count, _))| (med.to_string(), *count));

        Self {
            total_prescriptions: total,
            unique_patients: patients.len(),
            unique_prescribers: prescribers.len(),
            unique_medications: medications.len(),
            most_prescribed,
            chain_valid,
        }
    }
}
