//! Queue item data structures

use chrono::{DateTime, Duration, Utc};
use rxledger_core::{RiskAssessment, Submission};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};

/// Severity tier of a queued item; lower serves first
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Critical = 1,
    High = 2,
    Moderate = 3,
}

impl Tier {
    /// Numeric tier (1 = Critical)
    pub fn level(&self) -> u8 {
        *self as u8
    }

    /// One tier more severe; Critical stays Critical
    pub fn escalated(&self) -> Tier {
        match self {
            Tier::Moderate => Tier::High,
            Tier::High | Tier::Critical => Tier::Critical,
        }
    }
}

/// Lifecycle state of a queued item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Waiting for a reviewer
    Pending,
    /// Assigned to a reviewer
    UnderReview,
    /// Terminal: cleared by a reviewer
    Approved,
    /// Terminal: refused by a reviewer
    Rejected,
}

impl ReviewState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewState::Approved | ReviewState::Rejected)
    }
}

/// Reviewer decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn resulting_state(&self) -> ReviewState {
        match self {
            ReviewDecision::Approve => ReviewState::Approved,
            ReviewDecision::Reject => ReviewState::Rejected,
        }
    }
}

/// Monotonically assigned queue item id, rendered `RQ-000001`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RQ-{:06}", self.0)
    }
}

/// Append-only reviewer note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewNote {
    pub author: String,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// One entry of an item's escalation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationEntry {
    pub from: Tier,
    pub to: Tier,
    /// Name of the rule that fired
    pub rule: String,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// A flagged submission awaiting review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: ItemId,
    pub enqueued_at: DateTime<Utc>,
    pub tier: Tier,
    /// When the item entered its current tier
    pub tier_since: DateTime<Utc>,
    pub state: ReviewState,
    pub submission: Submission,
    pub assessment: RiskAssessment,
    pub reviewer: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    /// Fixed at enqueue; not moved by escalation
    pub sla_deadline: DateTime<Utc>,
    pub notes: Vec<ReviewNote>,
    pub escalations: Vec<EscalationEntry>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Seconds from assignment (or enqueue) to the terminal decision
    pub review_duration_secs: Option<i64>,
}

impl QueueItem {
    pub(crate) fn new(
        id: ItemId,
        submission: Submission,
        assessment: RiskAssessment,
        tier: Tier,
        sla: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            enqueued_at: now,
            tier,
            tier_since: now,
            state: ReviewState::Pending,
            submission,
            assessment,
            reviewer: None,
            assigned_at: None,
            sla_deadline: now + sla,
            notes: Vec::new(),
            escalations: Vec::new(),
            completed_at: None,
            review_duration_secs: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    pub fn is_pending(&self) -> bool {
        self.state == ReviewState::Pending
    }

    /// Past the SLA deadline, regardless of state
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        now > self.sla_deadline
    }

    /// Time spent in the current tier
    pub fn time_in_tier(&self, now: DateTime<Utc>) -> Duration {
        now - self.tier_since
    }

    /// True if a rule with this name has already fired for the item
    pub fn has_escalation(&self, rule: &str) -> bool {
        self.escalations.iter().any(|e| e.rule == rule)
    }

    pub fn review_duration(&self) -> Option<Duration> {
        self.review_duration_secs.map(Duration::seconds)
    }

    /// Serving order: tier, then enqueue time, then id
    pub(crate) fn sort_key(&self) -> (Tier, DateTime<Utc>, ItemId) {
        (self.tier, self.enqueued_at, self.id)
    }
}
