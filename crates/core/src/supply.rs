//! SupplyDuration - Days of supply parsed from a stated duration
//!
//! Accepts "30 days", "2 weeks", "1 month", "month", "90". A bare number is
//! read as days; a bare unit counts as one of that unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DAYS_PER_WEEK: u32 = 7;
const DAYS_PER_MONTH: u32 = 30;
const DAYS_PER_YEAR: u32 = 365;

/// Errors that can occur when parsing a supply duration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupplyError {
    #[error("Empty duration")]
    Empty,

    #[error("Unrecognised duration: {0}")]
    Unrecognised(String),

    #[error("Duration must be positive: {0}")]
    NotPositive(String),
}

/// Length of a prescribed supply in days
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SupplyDuration {
    days: u32,
}

impl SupplyDuration {
    /// Create from a number of days
    pub fn from_days(days: u32) -> Result<Self, SupplyError> {
        if days == 0 {
            return Err(SupplyError::NotPositive(days.to_string()));
        }
        Ok(Self { days })
    }

    /// Number of days of supply
    #[inline]
    pub fn days(&self) -> u32 {
        self.days
    }
}

impl FromStr for SupplyDuration {
    type Err = SupplyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_lowercase();
        if text.is_empty() {
            return Err(SupplyError::Empty);
        }

        let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
        let count: u32 = if digits.is_empty() {
            1
        } else {
            digits
                .parse()
                .map_err(|_| SupplyError::Unrecognised(s.to_string()))?
        };

        let unit = text[digits.len()..].trim_start();
        let multiplier = if unit.is_empty() || unit.starts_with("day") {
            1
        } else if unit.starts_with("week") {
            DAYS_PER_WEEK
        } else if unit.starts_with("month") {
            DAYS_PER_MONTH
        } else if unit.starts_with("year") {
            DAYS_PER_YEAR
        } else {
            return Err(SupplyError::Unrecognised(s.to_string()));
        };

        let days = count
            .checked_mul(multiplier)
            .ok_or_else(|| SupplyError::Unrecognised(s.to_string()))?;
        if days == 0 {
            return Err(SupplyError::NotPositive(s.to_string()));
        }

        Ok(Self { days })
    }
}

impl fmt::Display for SupplyDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_days() {
        let d: SupplyDuration = "30 days".parse().unwrap();
        assert_eq!(d.days(), 30);

        let d: SupplyDuration = "90".parse().unwrap();
        assert_eq!(d.days(), 90);
    }

    #[test]
    fn test_parse_weeks_months_years() {
        assert_eq!("2 weeks".parse::<SupplyDuration>().unwrap().days(), 14);
        assert_eq!("1 Month".parse::<SupplyDuration>().unwrap().days(), 30);
        assert_eq!("month".parse::<SupplyDuration>().unwrap().days(), 30);
        assert_eq!("1 year".parse::<SupplyDuration>().unwrap().days(), 365);
    }

    #[test]
    fn test_rejects_unknown_unit() {
        let result = "until finished".parse::<SupplyDuration>();
        assert!(matches!(result, Err(SupplyError::Unrecognised(_))));
    }

    #[test]
    fn test_rejects_zero_and_empty() {
        assert!(matches!("0 days".parse::<SupplyDuration>(), Err(SupplyError::NotPositive(_))));
        assert!(matches!("  ".parse::<SupplyDuration>(), Err(SupplyError::Empty)));
        assert!(SupplyDuration::from_days(0).is_err());
    }
}
