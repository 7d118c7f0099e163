//! Prescription - Typed submission payload
//!
//! Every named field is optional so that incomplete submissions can still be
//! represented, scored and routed to review. Anything the schema does not know
//! about lands in the extension map.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Open extension map for genuinely variable metadata (e.g. warning markers)
pub type Extensions = BTreeMap<String, serde_json::Value>;

/// Fields a prescription must carry to pass validation
pub const REQUIRED_FIELDS: [&str; 6] = [
    "patient_id",
    "patient_name",
    "medication",
    "dosage",
    "doctor_id",
    "doctor_name",
];

/// A prescription as submitted by the prescriber
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    /// Subject identifier, scopes history lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_age: Option<u32>,

    /// Medication name, also used as the treatment category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication: Option<String>,

    /// Free-text dosage instruction (e.g. "10mg once daily")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,

    /// Free-text supply duration (e.g. "30 days")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    /// Prescribing authority identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_prescribed: Option<NaiveDate>,

    /// Unrecognised fields, kept verbatim
    #[serde(flatten, default)]
    pub extensions: Extensions,
}

impl Prescription {
    /// Create a prescription for a patient and medication
    pub fn new(patient_id: impl Into<String>, medication: impl Into<String>) -> Self {
        Self {
            patient_id: Some(patient_id.into()),
            medication: Some(medication.into()),
            ..Self::default()
        }
    }

    /// Set patient name
    pub fn with_patient_name(mut self, name: impl Into<String>) -> Self {
        self.patient_name = Some(name.into());
        self
    }

    /// Set patient age in years
    pub fn with_patient_age(mut self, age: u32) -> Self {
        self.patient_age = Some(age);
        self
    }

    /// Set dosage instruction
    pub fn with_dosage(mut self, dosage: impl Into<String>) -> Self {
        self.dosage = Some(dosage.into());
        self
    }

    /// Set supply duration
    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    /// Set prescribing doctor
    pub fn with_doctor(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.doctor_id = Some(id.into());
        self.doctor_name = Some(name.into());
        self
    }

    /// Set the date of prescription
    pub fn with_date_prescribed(mut self, date: NaiveDate) -> Self {
        self.date_prescribed = Some(date);
        self
    }

    /// Attach an extension value
    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Names of required fields that are absent or blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let present = |field: &Option<String>| {
            field.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
        };

        REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|name| {
                let field = match *name {
                    "patient_id" => &self.patient_id,
                    "patient_name" => &self.patient_name,
                    "medication" => &self.medication,
                    "dosage" => &self.dosage,
                    "doctor_id" => &self.doctor_id,
                    _ => &self.doctor_name,
                };
                !present(field)
            })
            .collect()
    }

    /// Normalized medication key for category comparisons
    pub fn medication_key(&self) -> Option<String> {
        self.medication
            .as_deref()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
    }

    /// True if both prescriptions name the same medication (case-insensitive)
    pub fn same_medication(&self, other: &Prescription) -> bool {
        match (self.medication_key(), other.medication_key()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// A prescription stamped at intake
///
/// `submitted_at` is the reference time for every time-windowed risk signal,
/// which keeps scoring a pure function of its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Unique submission id (RX-XXXXXXXX)
    pub id: String,

    /// When the submission entered the pipeline
    pub submitted_at: DateTime<Utc>,

    pub prescription: Prescription,
}

impl Submission {
    /// Stamp a prescription with a fresh id and the current time
    pub fn new(prescription: Prescription) -> Self {
        Self::at(prescription, Utc::now())
    }

    /// Stamp a prescription at a specific time (for replay and tests)
    pub fn at(prescription: Prescription, submitted_at: DateTime<Utc>) -> Self {
        let id = format!("RX-{}", uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase());
        Self {
            id,
            submitted_at,
            prescription,
        }
    }

    /// Subject (patient) identifier, if present
    pub fn subject(&self) -> Option<&str> {
        self.prescription.patient_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Prescription {
        Prescription::new("P001", "Lisinopril")
            .with_patient_name("John Doe")
            .with_patient_age(45)
            .with_dosage("10mg once daily")
            .with_duration("30 days")
            .with_doctor("D101", "Dr. Sarah Smith")
    }

    #[test]
    fn test_complete_prescription_has_no_missing_fields() {
        assert!(complete().missing_fields().is_empty());
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        let p = Prescription::new("P003", "Amoxicillin").with_dosage("500mg three times daily");
        assert_eq!(p.missing_fields(), vec!["patient_name", "doctor_id", "doctor_name"]);
    }

    #[test]
    fn test_blank_field_counts_as_missing() {
        let mut p = complete();
        p.doctor_name = Some("   ".to_string());
        assert_eq!(p.missing_fields(), vec!["doctor_name"]);
    }

    #[test]
    fn test_same_medication_ignores_case() {
        let a = Prescription::new("P1", "Warfarin");
        let b = Prescription::new("P2", " warfarin ");
        let c = Prescription::new("P3", "Aspirin");
        assert!(a.same_medication(&b));
        assert!(!a.same_medication(&c));
        assert!(!a.same_medication(&Prescription::default()));
    }

    #[test]
    fn test_deserialize_keeps_unknown_fields() {
        let json = r#"{
            "patient_id": "P001",
            "medication": "Lisinopril",
            "pharmacy": "Main St"
        }"#;
        let p: Prescription = serde_json::from_str(json).unwrap();

        assert_eq!(p.patient_id.as_deref(), Some("P001"));
        assert_eq!(p.extensions.get("pharmacy"), Some(&serde_json::json!("Main St")));
    }

    #[test]
    fn test_submission_id_format() {
        let s = Submission::new(complete());
        assert!(s.id.starts_with("RX-"));
        assert_eq!(s.id.len(), 11);
        assert_eq!(s.subject(), Some("P001"));
    }
}
