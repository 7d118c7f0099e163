//! Notification gateways
//!
//! Transport is out of scope; the gateways here log or record deliveries so
//! the pipeline can be observed and tested.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rxledger_core::{RiskAssessment, Submission};
use rxledger_review::Tier;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::context::{NotificationContext, NotificationKind};
use crate::traits::NotificationGateway;

/// Outcome of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

/// Audit record of a notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub gateway: String,
    pub tier: Tier,
    pub kind: NotificationKind,
    pub item_id: String,
    pub submission_id: String,
    pub status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl DeliveryRecord {
    pub fn delivered(gateway: &str, tier: Tier, submission: &Submission, ctx: &NotificationContext) -> Self {
        Self {
            gateway: gateway.to_string(),
            tier,
            kind: ctx.kind,
            item_id: ctx.item_id.clone(),
            submission_id: submission.id.clone(),
            status: DeliveryStatus::Delivered,
            detail: None,
            sent_at: ctx.timestamp,
        }
    }

    pub fn failed(
        gateway: &str,
        tier: Tier,
        submission: &Submission,
        ctx: &NotificationContext,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status: DeliveryStatus::Failed,
            detail: Some(detail.into()),
            ..Self::delivered(gateway, tier, submission, ctx)
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.status == DeliveryStatus::Delivered
    }
}

/// Gateway that emits a structured log event per alert
#[derive(Debug, Clone, Default)]
pub struct TracingGateway;

#[async_trait]
impl NotificationGateway for TracingGateway {
    fn name(&self) -> &str {
        "TracingGateway"
    }

    async fn send(
        &self,
        tier: Tier,
        submission: &Submission,
        assessment: &RiskAssessment,
        ctx: &NotificationContext,
    ) -> DeliveryRecord {
        match tier {
            Tier::Critical => warn!(
                tier = %tier,
                item_id = %ctx.item_id,
                submission_id = %submission.id,
                score = assessment.score,
                reason = %ctx.reason,
                "Review alert"
            ),
            _ => info!(
                tier = %tier,
                item_id = %ctx.item_id,
                submission_id = %submission.id,
                score = assessment.score,
                reason = %ctx.reason,
                "Review alert"
            ),
        }
        DeliveryRecord::delivered(self.name(), tier, submission, ctx)
    }
}

/// Gateway that keeps every delivery in memory
///
/// A failing instance records the attempt with `DeliveryStatus::Failed`.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    fail: bool,
    sent: Mutex<Vec<DeliveryRecord>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose deliveries always fail
    pub fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Deliveries so far, in send order
    pub async fn records(&self) -> Vec<DeliveryRecord> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    fn name(&self) -> &str {
        "RecordingGateway"
    }

    async fn send(
        &self,
        tier: Tier,
        submission: &Submission,
        _assessment: &RiskAssessment,
        ctx: &NotificationContext,
    ) -> DeliveryRecord {
        let record = if self.fail {
            DeliveryRecord::failed(self.name(), tier, submission, ctx, "transport unavailable")
        } else {
            DeliveryRecord::delivered(self.name(), tier, submission, ctx)
        };
        self.sent.lock().await.push(record.clone());
        record
    }
}
