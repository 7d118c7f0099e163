//! Hook traits - interfaces for collaborators

use async_trait::async_trait;
use rxledger_core::{RiskAssessment, Submission, ValidationOutcome};
use rxledger_review::Tier;

use crate::context::{IntegrationContext, NotificationContext};
use crate::error::HookResult;
use crate::notify::DeliveryRecord;

/// Validates a submission before scoring
///
/// The pipeline only reads `is_valid` and `confidence` from the outcome.
/// Return `Err(_)` for validator failure (behavior depends on FailPolicy).
#[async_trait]
pub trait PrescriptionValidator: Send + Sync {
    /// Validator name for logging/audit
    fn name(&self) -> &str;

    async fn validate(&self, submission: &Submission) -> HookResult<ValidationOutcome>;
}

/// Delivers alerts for flagged and escalated items
///
/// Ordinary delivery failures are reported through the returned record's
/// status, never as an error.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Gateway name for logging/debugging
    fn name(&self) -> &str;

    async fn send(
        &self,
        tier: Tier,
        submission: &Submission,
        assessment: &RiskAssessment,
        ctx: &NotificationContext,
    ) -> DeliveryRecord;
}

/// Post-append integration (records, insurance, inventory)
///
/// Runs only after a successful append. The returned metadata is opaque to
/// the pipeline and attached to the submission result.
#[async_trait]
pub trait IntegrationHook: Send + Sync {
    /// Hook name for logging/debugging
    fn name(&self) -> &str;

    /// Priority (lower = runs first)
    fn priority(&self) -> u32 {
        100
    }

    async fn on_append(
        &self,
        submission: &Submission,
        ctx: &IntegrationContext,
    ) -> HookResult<serde_json::Value>;
}

/// A no-op integration (for testing)
pub struct NoOpIntegration;

#[async_trait]
impl IntegrationHook for NoOpIntegration {
    fn name(&self) -> &str {
        "NoOpIntegration"
    }

    async fn on_append(
        &self,
        _submission: &Submission,
        _ctx: &IntegrationContext,
    ) -> HookResult<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }
}
