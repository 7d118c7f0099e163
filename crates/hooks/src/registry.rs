//! Hook Registry - holds the collaborators and runs them

use std::sync::Arc;

use rxledger_core::{RiskAssessment, Submission, ValidationOutcome};
use rxledger_review::Tier;
use serde::{Deserialize, Serialize};

use crate::context::{IntegrationContext, NotificationContext};
use crate::integration::IntegrationOutcome;
use crate::notify::{DeliveryRecord, TracingGateway};
use crate::traits::{IntegrationHook, NotificationGateway, PrescriptionValidator};
use crate::validator::RuleBasedValidator;

/// Policy when the validator itself fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailPolicy {
    /// Treat the submission as invalid, sending it to review (DEFAULT)
    #[default]
    FailClosed,

    /// Treat the submission as valid with zero confidence
    FailOpen,
}

/// Registry of collaborators
///
/// Integrations run in priority order (lower = first). Every gateway
/// receives every notification.
pub struct HookRegistry {
    validator: Arc<dyn PrescriptionValidator>,
    gateways: Vec<Arc<dyn NotificationGateway>>,
    integrations: Vec<Arc<dyn IntegrationHook>>,
    fail_policy: FailPolicy,
}

impl Default for HookRegistry {
    /// Rule-based validator and a tracing gateway, no integrations
    fn default() -> Self {
        let mut registry = Self::new(Arc::new(RuleBasedValidator::new()));
        registry.register_gateway(Arc::new(TracingGateway));
        registry
    }
}

impl HookRegistry {
    /// Create a registry with a validator and no gateways or integrations
    pub fn new(validator: Arc<dyn PrescriptionValidator>) -> Self {
        Self {
            validator,
            gateways: Vec::new(),
            integrations: Vec::new(),
            fail_policy: FailPolicy::FailClosed,
        }
    }

    /// Set the fail policy
    pub fn with_fail_policy(mut self, policy: FailPolicy) -> Self {
        self.fail_policy = policy;
        self
    }

    pub fn register_gateway(&mut self, gateway: Arc<dyn NotificationGateway>) {
        self.gateways.push(gateway);
    }

    pub fn register_integration(&mut self, hook: Arc<dyn IntegrationHook>) {
        self.integrations.push(hook);
        // Sort by priority
        self.integrations.sort_by_key(|h| h.priority());
    }

    pub fn validator_name(&self) -> &str {
        self.validator.name()
    }

    /// Run the validator
    ///
    /// A validator failure never aborts the pipeline; the fail policy decides
    /// what outcome it turns into.
    pub async fn validate(&self, submission: &Submission) -> ValidationOutcome {
        match self.validator.validate(submission).await {
            Ok(outcome) => {
                tracing::debug!(
                    validator = self.validator.name(),
                    submission_id = %submission.id,
                    is_valid = outcome.is_valid,
                    confidence = outcome.confidence,
                    "Validation completed"
                );
                outcome
            }
            Err(e) => {
                tracing::error!(
                    validator = self.validator.name(),
                    submission_id = %submission.id,
                    error = %e,
                    "Validator failed"
                );
                let at = submission.submitted_at;
                match self.fail_policy {
                    FailPolicy::FailClosed => ValidationOutcome::failed(
                        self.validator.name(),
                        vec![format!("Validator failed: {}", e)],
                        at,
                    ),
                    FailPolicy::FailOpen => {
                        tracing::warn!(
                            validator = self.validator.name(),
                            "FailOpen: continuing despite validator failure"
                        );
                        let mut outcome = ValidationOutcome::passed(self.validator.name(), at);
                        outcome.confidence = 0.0;
                        outcome.warnings.push(format!("Validator failed: {}", e));
                        outcome
                    }
                }
            }
        }
    }

    /// Send a notification through every gateway
    pub async fn notify(
        &self,
        tier: Tier,
        submission: &Submission,
        assessment: &RiskAssessment,
        ctx: &NotificationContext,
    ) -> Vec<DeliveryRecord> {
        let mut records = Vec::with_capacity(self.gateways.len());
        for gateway in &self.gateways {
            let record = gateway.send(tier, submission, assessment, ctx).await;
            if !record.is_delivered() {
                tracing::warn!(
                    gateway = gateway.name(),
                    item_id = %ctx.item_id,
                    tier = %tier,
                    detail = record.detail.as_deref().unwrap_or(""),
                    "Notification delivery failed"
                );
            }
            records.push(record);
        }
        records
    }

    /// Run every integration after an append
    ///
    /// Failures are logged and reported in the outcome; later integrations
    /// still run.
    pub async fn run_integrations(
        &self,
        submission: &Submission,
        ctx: &IntegrationContext,
    ) -> Vec<IntegrationOutcome> {
        let mut outcomes = Vec::with_capacity(self.integrations.len());
        for hook in &self.integrations {
            match hook.on_append(submission, ctx).await {
                Ok(metadata) => {
                    tracing::debug!(
                        hook = hook.name(),
                        record_index = ctx.record_index,
                        "Integration completed"
                    );
                    outcomes.push(IntegrationOutcome::ok(hook.name(), metadata));
                }
                Err(e) => {
                    tracing::error!(
                        hook = hook.name(),
                        record_index = ctx.record_index,
                        error = %e,
                        "Integration failed"
                    );
                    outcomes.push(IntegrationOutcome::failed(hook.name(), e.to_string()));
                }
            }
        }
        outcomes
    }

    /// Number of gateways
    pub fn gateway_count(&self) -> usize {
        self.gateways.len()
    }

    /// Number of integrations
    pub fn integration_count(&self) -> usize {
        self.integrations.len()
    }
}
