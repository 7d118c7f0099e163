//! Review queue configuration
//!
//! SLA offsets and escalation thresholds are configurable via file. Defaults
//! are the reference values: 2h / 24h SLA, 15m / 1h / 4h escalation.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::item::Tier;

/// Configuration for the Review Queue and Escalation Engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewConfig {
    // === SLA ===
    /// SLA offset for Critical items (in hours)
    #[serde(default = "default_critical_sla_hours")]
    pub critical_sla_hours: i64,

    /// SLA offset for High and Moderate items (in hours)
    #[serde(default = "default_standard_sla_hours")]
    pub standard_sla_hours: i64,

    // === Routing ===
    /// Flagged submissions scoring at or above this enter as Critical
    #[serde(default = "default_critical_score")]
    pub critical_score: f64,

    // === Escalation ===
    /// Critical item still Pending after this long is re-alerted (in minutes)
    #[serde(default = "default_critical_realert_minutes")]
    pub critical_realert_minutes: i64,

    /// High item active longer than this becomes Critical (in minutes)
    #[serde(default = "default_high_escalation_minutes")]
    pub high_escalation_minutes: i64,

    /// Moderate item active longer than this becomes High (in minutes)
    #[serde(default = "default_moderate_escalation_minutes")]
    pub moderate_escalation_minutes: i64,

    /// Re-alert a Critical item at most once
    #[serde(default = "default_realert_once")]
    pub realert_once: bool,
}

// Default value functions for serde
fn default_critical_sla_hours() -> i64 {
    2
}

fn default_standard_sla_hours() -> i64 {
    24
}

fn default_critical_score() -> f64 {
    80.0
}

fn default_critical_realert_minutes() -> i64 {
    15
}

fn default_high_escalation_minutes() -> i64 {
    60
}

fn default_moderate_escalation_minutes() -> i64 {
    240 // 4 hours
}

fn default_realert_once() -> bool {
    true
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            critical_sla_hours: default_critical_sla_hours(),
            standard_sla_hours: default_standard_sla_hours(),
            critical_score: default_critical_score(),
            critical_realert_minutes: default_critical_realert_minutes(),
            high_escalation_minutes: default_high_escalation_minutes(),
            moderate_escalation_minutes: default_moderate_escalation_minutes(),
            realert_once: default_realert_once(),
        }
    }
}

impl ReviewConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// SLA offset for an item entering at the given tier
    pub fn sla_for(&self, tier: Tier) -> Duration {
        match tier {
            Tier::Critical => Duration::hours(self.critical_sla_hours),
            Tier::High | Tier::Moderate => Duration::hours(self.standard_sla_hours),
        }
    }

    /// Entry tier for a flagged submission with the given score
    pub fn tier_for_score(&self, score: f64) -> Tier {
        if score >= self.critical_score {
            Tier::Critical
        } else {
            Tier::High
        }
    }

    pub fn critical_realert(&self) -> Duration {
        Duration::minutes(self.critical_realert_minutes)
    }

    pub fn high_escalation(&self) -> Duration {
        Duration::minutes(self.high_escalation_minutes)
    }

    pub fn moderate_escalation(&self) -> Duration {
        Duration::minutes(self.moderate_escalation_minutes)
    }
}
