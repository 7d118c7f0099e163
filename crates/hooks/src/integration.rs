//! Post-append integrations

use async_trait::async_trait;
use rxledger_core::Submission;
use serde::{Deserialize, Serialize};

use crate::context::IntegrationContext;
use crate::error::HookResult;
use crate::traits::IntegrationHook;

/// Result of one integration, attached to the submission result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationOutcome {
    pub hook: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntegrationOutcome {
    pub fn ok(hook: &str, metadata: serde_json::Value) -> Self {
        Self {
            hook: hook.to_string(),
            metadata: Some(metadata),
            error: None,
        }
    }

    pub fn failed(hook: &str, error: impl Into<String>) -> Self {
        Self {
            hook: hook.to_string(),
            metadata: None,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Integration that acknowledges every append with a reference to the record
///
/// Stands in for records, insurance and inventory systems until a real
/// transport is wired.
#[derive(Debug, Clone)]
pub struct StaticIntegration {
    name: String,
    system: String,
    priority: u32,
}

impl StaticIntegration {
    pub fn new(name: impl Into<String>, system: impl Into<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            system: system.into(),
            priority,
        }
    }

    /// Medical records sync
    pub fn records() -> Self {
        Self::new("RecordsSync", "ehr", 10)
    }

    /// Insurance claim pre-authorization
    pub fn insurance() -> Self {
        Self::new("InsuranceClaim", "insurance", 20)
    }

    /// Pharmacy inventory reservation
    pub fn inventory() -> Self {
        Self::new("InventoryReserve", "inventory", 30)
    }
}

#[async_trait]
impl IntegrationHook for StaticIntegration {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn on_append(
        &self,
        submission: &Submission,
        ctx: &IntegrationContext,
    ) -> HookResult<serde_json::Value> {
        Ok(serde_json::json!({
            "system": self.system,
            "reference": format!("{}-{}", self.system.to_uppercase(), ctx.record_index),
            "submission_id": submission.id,
            "record_hash": ctx.record_hash,
        }))
    }
}
