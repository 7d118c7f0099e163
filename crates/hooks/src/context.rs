//! Hook context - data passed to collaborators

use chrono::{DateTime, Utc};
use rxledger_core::Submission;
use serde::{Deserialize, Serialize};

/// Why a notification is being sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Submission was flagged and enqueued
    Flagged,
    /// Escalation sweep promoted the item
    Escalated,
    /// Escalation sweep re-alerted without promotion
    Realert,
}

/// Context passed to notification gateways
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationContext {
    pub kind: NotificationKind,

    /// Queue item the notification is about
    pub item_id: String,

    /// Human-readable reason (routing or escalation rule)
    pub reason: String,

    pub timestamp: DateTime<Utc>,
}

impl NotificationContext {
    pub fn new(
        kind: NotificationKind,
        item_id: impl Into<String>,
        reason: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            item_id: item_id.into(),
            reason: reason.into(),
            timestamp,
        }
    }
}

/// Context passed to integrations after a successful append
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationContext {
    pub submission_id: String,

    /// Index of the new ledger record
    pub record_index: u64,

    /// Hash of the new ledger record
    pub record_hash: String,

    /// Whether the record carries a risk warning marker
    pub with_warning: bool,

    pub timestamp: DateTime<Utc>,
}

impl IntegrationContext {
    pub fn new(
        submission: &Submission,
        record_index: u64,
        record_hash: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            submission_id: submission.id.clone(),
            record_index,
            record_hash: record_hash.into(),
            with_warning: false,
            timestamp,
        }
    }

    /// Mark the record as accepted with a warning
    pub fn with_warning(mut self, warning: bool) -> Self {
        self.with_warning = warning;
        self
    }
}
