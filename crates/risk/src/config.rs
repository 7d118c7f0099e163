//! Risk scoring configuration
//!
//! Window, weights and every threshold table are configurable via file so the
//! scorer can be tuned without recompilation. Defaults reproduce the reference
//! scoring model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One threshold step: a sub-score awarded once a value crosses `bound`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub bound: Decimal,
    pub score: f64,
}

impl Band {
    pub fn new(bound: Decimal, score: f64) -> Self {
        Self { bound, score }
    }
}

/// Highest score among bands whose bound is `<= value`
pub fn score_at_least(value: Decimal, bands: &[Band]) -> f64 {
    bands
        .iter()
        .filter(|b| value >= b.bound)
        .map(|b| b.score)
        .fold(0.0, f64::max)
}

/// Highest score among bands whose bound is `> value`
pub fn score_below(value: Decimal, bands: &[Band]) -> f64 {
    bands
        .iter()
        .filter(|b| value < b.bound)
        .map(|b| b.score)
        .fold(0.0, f64::max)
}

/// Weight applied to each sub-score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    #[serde(default = "default_frequency_weight")]
    pub frequency: f64,

    #[serde(default = "default_prescribers_weight")]
    pub prescribers: f64,

    #[serde(default = "default_dosage_weight")]
    pub dosage_escalation: f64,

    #[serde(default = "default_early_repeat_weight")]
    pub early_repeat: f64,

    #[serde(default = "default_sensitivity_weight")]
    pub high_sensitivity: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            frequency: default_frequency_weight(),
            prescribers: default_prescribers_weight(),
            dosage_escalation: default_dosage_weight(),
            early_repeat: default_early_repeat_weight(),
            high_sensitivity: default_sensitivity_weight(),
        }
    }
}

/// Configuration for the Risk Scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Trailing window for the frequency signal (in days)
    #[serde(default = "default_window_days")]
    pub window_days: i64,

    #[serde(default)]
    pub weights: SignalWeights,

    /// Same-subject prescriptions within the window
    #[serde(default = "default_frequency_bands")]
    pub frequency_bands: Vec<Band>,

    /// Distinct prescribers for the same medication
    #[serde(default = "default_prescriber_bands")]
    pub prescriber_bands: Vec<Band>,

    /// Current dose divided by mean historical dose
    #[serde(default = "default_dosage_bands")]
    pub dosage_bands: Vec<Band>,

    /// Elapsed days divided by supplied days; lower is riskier
    #[serde(default = "default_early_repeat_bands")]
    pub early_repeat_bands: Vec<Band>,

    /// Medication names (or fragments) in high-sensitivity categories
    #[serde(default = "default_high_sensitivity_medications")]
    pub high_sensitivity_medications: Vec<String>,
}

// Default value functions for serde
fn default_window_days() -> i64 {
    30
}

fn default_frequency_weight() -> f64 {
    0.25
}

fn default_prescribers_weight() -> f64 {
    0.30
}

fn default_dosage_weight() -> f64 {
    0.20
}

fn default_early_repeat_weight() -> f64 {
    0.15
}

fn default_sensitivity_weight() -> f64 {
    0.10
}

fn default_frequency_bands() -> Vec<Band> {
    vec![
        Band::new(Decimal::new(6, 0), 100.0),
        Band::new(Decimal::new(4, 0), 70.0),
        Band::new(Decimal::new(3, 0), 40.0),
    ]
}

fn default_prescriber_bands() -> Vec<Band> {
    vec![
        Band::new(Decimal::new(4, 0), 100.0),
        Band::new(Decimal::new(3, 0), 75.0),
        Band::new(Decimal::new(2, 0), 40.0),
    ]
}

fn default_dosage_bands() -> Vec<Band> {
    vec![
        Band::new(Decimal::new(25, 1), 100.0),
        Band::new(Decimal::new(20, 1), 70.0),
        Band::new(Decimal::new(15, 1), 40.0),
    ]
}

fn default_early_repeat_bands() -> Vec<Band> {
    vec![
        Band::new(Decimal::new(5, 1), 100.0),
        Band::new(Decimal::new(7, 1), 70.0),
        Band::new(Decimal::new(9, 1), 40.0),
    ]
}

fn default_high_sensitivity_medications() -> Vec<String> {
    [
        // Opioids
        "oxycodone",
        "hydrocodone",
        "morphine",
        "fentanyl",
        "codeine",
        "tramadol",
        "methadone",
        "hydromorphone",
        // Benzodiazepines
        "alprazolam",
        "diazepam",
        "lorazepam",
        "clonazepam",
        // Stimulants
        "adderall",
        "amphetamine",
        "methylphenidate",
        // Sedative hypnotics
        "zolpidem",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            weights: SignalWeights::default(),
            frequency_bands: default_frequency_bands(),
            prescriber_bands: default_prescriber_bands(),
            dosage_bands: default_dosage_bands(),
            early_repeat_bands: default_early_repeat_bands(),
            high_sensitivity_medications: default_high_sensitivity_medications(),
        }
    }
}

impl RiskConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Frequency window as chrono Duration
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::days(self.window_days)
    }

    /// True if the medication falls in a high-sensitivity category
    pub fn is_high_sensitivity(&self, medication: &str) -> bool {
        let medication = medication.to_lowercase();
        self.high_sensitivity_medications
            .iter()
            .any(|m| !m.is_empty() && medication.contains(&m.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RiskConfig::default();
        assert_eq!(config.window_days, 30);
        assert_eq!(config.weights.frequency, 0.25);
        assert_eq!(config.weights.prescribers, 0.30);
        assert_eq!(config.weights.dosage_escalation, 0.20);
        assert_eq!(config.weights.early_repeat, 0.15);
        assert_eq!(config.weights.high_sensitivity, 0.10);
        assert_eq!(config.frequency_bands.len(), 3);
    }

    #[test]
    fn test_score_at_least() {
        let bands = default_frequency_bands();
        assert_eq!(score_at_least(dec!(2), &bands), 0.0);
        assert_eq!(score_at_least(dec!(3), &bands), 40.0);
        assert_eq!(score_at_least(dec!(5), &bands), 70.0);
        assert_eq!(score_at_least(dec!(6), &bands), 100.0);
        assert_eq!(score_at_least(dec!(60), &bands), 100.0);
    }

    #[test]
    fn test_score_below() {
        let bands = default_early_repeat_bands();
        assert_eq!(score_below(dec!(0.2), &bands), 100.0);
        assert_eq!(score_below(dec!(0.5), &bands), 70.0);
        assert_eq!(score_below(dec!(0.89), &bands), 40.0);
        assert_eq!(score_below(dec!(0.9), &bands), 0.0);
    }

    #[test]
    fn test_high_sensitivity_match() {
        let config = RiskConfig::default();
        assert!(config.is_high_sensitivity("OxyContin (Oxycodone ER)"));
        assert!(config.is_high_sensitivity("Alprazolam"));
        assert!(!config.is_high_sensitivity("Lisinopril"));
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "window_days": 14, "weights": {{ "frequency": 0.5 }} }}"#).unwrap();

        let config = RiskConfig::from_file(file.path()).unwrap();
        assert_eq!(config.window_days, 14);
        assert_eq!(config.weights.frequency, 0.5);
        assert_eq!(config.weights.prescribers, 0.30);
        assert_eq!(config.dosage_bands, default_dosage_bands());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = RiskConfig::from_file(file.path()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
