//! Dosage - Numeric quantity parsed from a free-text instruction
//!
//! "10mg once daily" parses to quantity 10 with unit "mg". Only the first
//! number is taken; frequency words are ignored.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing a dosage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DosageError {
    #[error("Dosage has no numeric quantity: {0}")]
    NoQuantity(String),

    #[error("Invalid dosage quantity: {0}")]
    InvalidQuantity(String),
}

/// A dosage quantity with its unit
///
/// # Example
/// ```
/// use rxledger_core::Dosage;
/// use rust_decimal::Decimal;
///
/// let dose: Dosage = "10mg once daily".parse().unwrap();
/// assert_eq!(dose.quantity, Decimal::new(10, 0));
/// assert_eq!(dose.unit.as_deref(), Some("mg"));
///
/// assert!("as needed".parse::<Dosage>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dosage {
    pub quantity: Decimal,
    pub unit: Option<String>,
}

impl FromStr for Dosage {
    type Err = DosageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let start = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| DosageError::NoQuantity(s.to_string()))?;
        let rest = &s[start..];

        let mut seen_dot = false;
        let end = rest
            .find(|c: char| {
                if c == '.' && !seen_dot {
                    seen_dot = true;
                    false
                } else {
                    !c.is_ascii_digit()
                }
            })
            .unwrap_or(rest.len());

        let number = rest[..end].trim_end_matches('.');
        let quantity = Decimal::from_str(number)
            .map_err(|_| DosageError::InvalidQuantity(number.to_string()))?;

        let unit: String = rest[end..]
            .trim_start()
            .chars()
            .take_while(|c| c.is_alphabetic())
            .collect();

        Ok(Self {
            quantity,
            unit: if unit.is_empty() {
                None
            } else {
                Some(unit.to_lowercase())
            },
        })
    }
}

impl fmt::Display for Dosage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{}{}", self.quantity, unit),
            None => write!(f, "{}", self.quantity),
        }
    }
}
