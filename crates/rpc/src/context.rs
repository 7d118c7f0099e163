//! Application context - wires everything together

use chrono::{DateTime, Utc};
use rxledger_core::{Prescription, RiskAssessment, Submission, ValidationOutcome};
use rxledger_hooks::{
    DeliveryRecord, HookRegistry, IntegrationContext, IntegrationOutcome, NotificationContext,
    NotificationKind,
};
use rxledger_ledger::{Ledger, LedgerError, LedgerStats, Record, RecordPayload, RecordReport};
use rxledger_review::{
    EscalationEngine, EscalationEvent, ItemId, QueueItem, QueueStatus, ReviewDecision, ReviewError,
    ReviewQueue, RuleAction, Tier,
};
use rxledger_risk::RiskScorer;
use serde::Serialize;
use std::io::BufWriter;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::config::AppConfig;
use crate::router::{route, Decision};

/// Errors surfaced by the pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Review error: {0}")]
    Review(#[from] ReviewError),

    #[error("Export failed: {0}")]
    Export(#[from] std::io::Error),
}

impl PipelineError {
    /// True if the ledger has been found corrupt
    pub fn is_integrity(&self) -> bool {
        matches!(self, PipelineError::Ledger(e) if e.is_integrity())
    }
}

/// What happened to a submission after routing
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Appended to the ledger
    Recorded {
        index: u64,
        hash: String,
        integrations: Vec<IntegrationOutcome>,
    },
    /// Held in the review queue
    Queued {
        item_id: ItemId,
        tier: Tier,
        deliveries: Vec<DeliveryRecord>,
    },
}

/// Full result of one submission
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub submission_id: String,
    pub decision: Decision,
    pub validation: ValidationOutcome,
    pub assessment: RiskAssessment,
    pub outcome: SubmissionOutcome,
}

impl SubmissionResult {
    /// Ledger index, if the submission was recorded
    pub fn record_index(&self) -> Option<u64> {
        match self.outcome {
            SubmissionOutcome::Recorded { index, .. } => Some(index),
            SubmissionOutcome::Queued { .. } => None,
        }
    }

    /// Queue item id, if the submission was flagged
    pub fn item_id(&self) -> Option<ItemId> {
        match self.outcome {
            SubmissionOutcome::Queued { item_id, .. } => Some(item_id),
            SubmissionOutcome::Recorded { .. } => None,
        }
    }
}

/// Escalations fired by one sweep and their notifications
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub events: Vec<EscalationEvent>,
    pub deliveries: Vec<DeliveryRecord>,
}

impl SweepReport {
    pub fn promoted(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.action == RuleAction::Promote)
            .count()
    }
}

/// Pipeline counters
#[derive(Debug, Default)]
struct PipelineMetrics {
    submitted: AtomicU64,
    accepted: AtomicU64,
    accepted_with_warning: AtomicU64,
    flagged: AtomicU64,
    escalations: AtomicU64,
    notifications_failed: AtomicU64,
    integrations_failed: AtomicU64,
}

/// Point-in-time copy of the pipeline counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub accepted: u64,
    pub accepted_with_warning: u64,
    pub flagged: u64,
    pub escalations: u64,
    pub notifications_failed: u64,
    pub integrations_failed: u64,
}

impl PipelineMetrics {
    fn incr(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            accepted_with_warning: self.accepted_with_warning.load(Ordering::Relaxed),
            flagged: self.flagged.load(Ordering::Relaxed),
            escalations: self.escalations.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
            integrations_failed: self.integrations_failed.load(Ordering::Relaxed),
        }
    }
}

/// Application context - wires together all components
///
/// Constructed once per process and shared (typically behind an `Arc`).
/// The ledger and the queue each have a single writer at a time;
/// collaborators are always called after the lock is released.
pub struct AppContext {
    config: AppConfig,
    ledger: RwLock<Ledger>,
    queue: Mutex<ReviewQueue>,
    scorer: RiskScorer,
    escalation: EscalationEngine,
    hooks: HookRegistry,
    metrics: PipelineMetrics,
}

impl AppContext {
    /// Create a context with the default collaborators
    pub fn new(config: AppConfig) -> Result<Self, PipelineError> {
        let hooks = HookRegistry::default().with_fail_policy(config.validator_fail_policy);
        Self::with_hooks(config, hooks)
    }

    /// Create a context with custom collaborators
    pub fn with_hooks(config: AppConfig, hooks: HookRegistry) -> Result<Self, PipelineError> {
        let ledger = Ledger::new()?;
        let queue = ReviewQueue::new(config.review.clone());
        let escalation = EscalationEngine::new(&config.review);
        let scorer = RiskScorer::new(config.risk.clone());

        info!(
            validator = hooks.validator_name(),
            gateways = hooks.gateway_count(),
            integrations = hooks.integration_count(),
            "Pipeline initialized"
        );

        Ok(Self {
            config,
            ledger: RwLock::new(ledger),
            queue: Mutex::new(queue),
            scorer,
            escalation,
            hooks,
            metrics: PipelineMetrics::default(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Submit a prescription stamped with the current time
    pub async fn submit(&self, prescription: Prescription) -> Result<SubmissionResult, PipelineError> {
        self.submit_at(prescription, Utc::now()).await
    }

    /// Submit a prescription stamped at `now`
    ///
    /// Flow: Validate → (lock ledger) History → Score → Route → Append
    /// → (unlock) Integrations; or Route → Enqueue → Notify on Flag.
    pub async fn submit_at(
        &self,
        prescription: Prescription,
        now: DateTime<Utc>,
    ) -> Result<SubmissionResult, PipelineError> {
        let submission = Submission::at(prescription, now);
        PipelineMetrics::incr(&self.metrics.submitted, 1);

        // 1. Validation collaborator (no lock held)
        let validation = self.hooks.validate(&submission).await;

        // 2. Score and route under the ledger write lock, so history and
        //    append are consistent for this submission
        let mut ledger = self.ledger.write().await;
        let history = match submission.subject() {
            Some(subject) => ledger.patient_history(subject),
            None => Vec::new(),
        };
        let assessment = self.scorer.assess(&history, &submission);
        let decision = route(&validation, &assessment);

        info!(
            submission_id = %submission.id,
            decision = %decision,
            score = assessment.score,
            level = %assessment.level,
            is_valid = validation.is_valid,
            "Submission routed"
        );

        match decision {
            Decision::Accept | Decision::AcceptWithWarning => {
                let with_warning = decision == Decision::AcceptWithWarning;
                let report = if with_warning {
                    RecordReport::accepted_with_warning(validation.clone(), assessment.clone())
                } else {
                    RecordReport::accepted(validation.clone(), assessment.clone())
                };

                // 3a. Append
                let record = ledger.append_at(RecordPayload::Prescription(submission.clone()), report, now)?;
                let (index, hash) = (record.index, record.hash.clone());
                drop(ledger);

                if with_warning {
                    PipelineMetrics::incr(&self.metrics.accepted_with_warning, 1);
                } else {
                    PipelineMetrics::incr(&self.metrics.accepted, 1);
                }

                // 4a. Integrations (no lock held)
                let ctx = IntegrationContext::new(&submission, index, hash.clone(), now).with_warning(with_warning);
                let integrations = self.hooks.run_integrations(&submission, &ctx).await;
                let failed = integrations.iter().filter(|o| !o.is_ok()).count() as u64;
                PipelineMetrics::incr(&self.metrics.integrations_failed, failed);

                Ok(SubmissionResult {
                    submission_id: submission.id,
                    decision,
                    validation,
                    assessment,
                    outcome: SubmissionOutcome::Recorded {
                        index,
                        hash,
                        integrations,
                    },
                })
            }
            Decision::Flag => {
                drop(ledger);
                let tier = self.config.review.tier_for_score(assessment.score);

                // 3b. Enqueue
                let item_id = {
                    let mut queue = self.queue.lock().await;
                    queue.enqueue_at(submission.clone(), assessment.clone(), tier, now)
                };
                PipelineMetrics::incr(&self.metrics.flagged, 1);

                // 4b. Notify (no lock held)
                let reason = flag_reason(&validation, &assessment);
                let ctx = NotificationContext::new(NotificationKind::Flagged, item_id.to_string(), reason, now);
                let deliveries = self.hooks.notify(tier, &submission, &assessment, &ctx).await;
                self.count_failed_deliveries(&deliveries);

                Ok(SubmissionResult {
                    submission_id: submission.id,
                    decision,
                    validation,
                    assessment,
                    outcome: SubmissionOutcome::Queued {
                        item_id,
                        tier,
                        deliveries,
                    },
                })
            }
        }
    }

    /// Run one escalation sweep at the current time
    pub async fn run_escalation_sweep(&self) -> SweepReport {
        self.run_escalation_sweep_at(Utc::now()).await
    }

    /// Run one escalation sweep at `now` and notify for every event
    pub async fn run_escalation_sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let events = {
            let mut queue = self.queue.lock().await;
            self.escalation.check_escalations_at(&mut queue, now)
        };
        PipelineMetrics::incr(&self.metrics.escalations, events.len() as u64);

        let mut deliveries = Vec::new();
        for event in &events {
            let kind = match event.action {
                RuleAction::Realert => NotificationKind::Realert,
                RuleAction::Promote => NotificationKind::Escalated,
            };
            let ctx = NotificationContext::new(kind, event.item_id.to_string(), event.reason.clone(), now);
            let records = self
                .hooks
                .notify(event.to, &event.submission, &event.assessment, &ctx)
                .await;
            self.count_failed_deliveries(&records);
            deliveries.extend(records);
        }

        SweepReport { events, deliveries }
    }

    fn count_failed_deliveries(&self, deliveries: &[DeliveryRecord]) {
        let failed = deliveries.iter().filter(|d| !d.is_delivered()).count() as u64;
        PipelineMetrics::incr(&self.metrics.notifications_failed, failed);
    }

    // === Review queue ===

    /// Place a submission in the queue directly, bypassing routing
    pub async fn enqueue_at(
        &self,
        submission: Submission,
        assessment: RiskAssessment,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> ItemId {
        let mut queue = self.queue.lock().await;
        queue.enqueue_at(submission, assessment, tier, now)
    }

    /// Next Pending item to review
    pub async fn next_item(&self) -> Option<QueueItem> {
        self.queue.lock().await.next_item().cloned()
    }

    pub async fn queue_item(&self, id: ItemId) -> Option<QueueItem> {
        self.queue.lock().await.get(id).cloned()
    }

    pub async fn assign(&self, id: ItemId, reviewer: &str) -> Result<QueueItem, PipelineError> {
        self.assign_at(id, reviewer, Utc::now()).await
    }

    pub async fn assign_at(&self, id: ItemId, reviewer: &str, now: DateTime<Utc>) -> Result<QueueItem, PipelineError> {
        let mut queue = self.queue.lock().await;
        Ok(queue.assign_at(id, reviewer, now)?.clone())
    }

    pub async fn complete_review(
        &self,
        id: ItemId,
        decision: ReviewDecision,
        notes: &str,
        reviewer: &str,
    ) -> Result<QueueItem, PipelineError> {
        self.complete_review_at(id, decision, notes, reviewer, Utc::now()).await
    }

    pub async fn complete_review_at(
        &self,
        id: ItemId,
        decision: ReviewDecision,
        notes: &str,
        reviewer: &str,
        now: DateTime<Utc>,
    ) -> Result<QueueItem, PipelineError> {
        let mut queue = self.queue.lock().await;
        Ok(queue.complete_review_at(id, decision, notes, reviewer, now)?.clone())
    }

    pub async fn add_note(&self, id: ItemId, author: &str, text: &str) -> Result<(), PipelineError> {
        let mut queue = self.queue.lock().await;
        queue.add_note(id, author, text)?;
        Ok(())
    }

    pub async fn queue_status(&self) -> QueueStatus {
        self.queue_status_at(Utc::now()).await
    }

    pub async fn queue_status_at(&self, now: DateTime<Utc>) -> QueueStatus {
        self.queue.lock().await.status_at(now)
    }

    // === Ledger ===

    pub async fn verify_integrity(&self) -> bool {
        self.ledger.read().await.verify_integrity()
    }

    /// Verify the chain; a corrupt chain halts further appends
    pub async fn audit(&self) -> Result<(), PipelineError> {
        let mut ledger = self.ledger.write().await;
        ledger.audit().map_err(|e| {
            error!(error = %e, "Ledger audit failed");
            PipelineError::from(e)
        })
    }

    pub async fn ledger_len(&self) -> usize {
        self.ledger.read().await.len()
    }

    pub async fn ledger_records(&self) -> Vec<Record> {
        self.ledger.read().await.records().to_vec()
    }

    pub async fn patient_history(&self, patient_id: &str) -> Vec<Record> {
        self.ledger.read().await.patient_history(patient_id)
    }

    pub async fn prescriber_history(&self, doctor_id: &str) -> Vec<Record> {
        self.ledger.read().await.prescriber_history(doctor_id)
    }

    pub async fn search_by_medication(&self, term: &str) -> Vec<Record> {
        self.ledger.read().await.search_by_medication(term)
    }

    pub async fn ledger_stats(&self) -> LedgerStats {
        self.ledger.read().await.stats()
    }

    /// Export the ledger as JSON lines
    pub async fn export_jsonl(&self, path: &Path) -> Result<usize, PipelineError> {
        let file = std::fs::File::create(path)?;
        let ledger = self.ledger.read().await;
        let written = ledger.write_jsonl(BufWriter::new(file))?;
        info!(path = %path.display(), records = written, "Ledger exported");
        Ok(written)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Reason attached to the flag notification
fn flag_reason(validation: &ValidationOutcome, assessment: &RiskAssessment) -> String {
    if !validation.is_valid {
        let errors = if validation.errors.is_empty() {
            "validation failed".to_string()
        } else {
            validation.errors.join("; ")
        };
        format!("Validation failed: {}", errors)
    } else {
        format!("{} risk (score {:.1})", assessment.level, assessment.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 9, 9, 0, 0).unwrap()
    }

    fn complete(patient: &str, medication: &str) -> Prescription {
        Prescription::new(patient, medication)
            .with_patient_name("Test Patient")
            .with_patient_age(45)
            .with_dosage("10mg once daily")
            .with_duration("30 days")
            .with_doctor("D101", "Dr. Sarah Smith")
    }

    #[tokio::test]
    async fn test_accept_appends() {
        let ctx = AppContext::new(AppConfig::default()).unwrap();
        let result = ctx.submit_at(complete("P001", "Lisinopril"), t0()).await.unwrap();

        assert_eq!(result.decision, Decision::Accept);
        assert_eq!(result.record_index(), Some(1));
        assert_eq!(ctx.ledger_len().await, 2);
        assert_eq!(ctx.metrics().accepted, 1);
    }

    #[tokio::test]
    async fn test_flag_enqueues_without_append() {
        let ctx = AppContext::new(AppConfig::default()).unwrap();
        let result = ctx
            .submit_at(Prescription::new("P003", "Amoxicillin").with_dosage("500mg"), t0())
            .await
            .unwrap();

        assert_eq!(result.decision, Decision::Flag);
        assert!(result.item_id().is_some());
        assert_eq!(ctx.ledger_len().await, 1);
        assert_eq!(ctx.queue_status_at(t0()).await.pending, 1);
        assert_eq!(ctx.metrics().flagged, 1);
    }

    #[tokio::test]
    async fn test_audit_and_export_clean_chain() {
        let ctx = AppContext::new(AppConfig::default()).unwrap();
        ctx.submit_at(complete("P001", "Lisinopril"), t0()).await.unwrap();
        ctx.submit_at(complete("P002", "Metformin"), t0() + Duration::hours(1))
            .await
            .unwrap();

        assert!(ctx.audit().await.is_ok());
        assert!(ctx.verify_integrity().await);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        assert_eq!(ctx.export_jsonl(&path).await.unwrap(), 3);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_flag_reason() {
        let v = ValidationOutcome::failed("t", vec!["Missing required fields: doctor_id".into()], t0());
        let a = RiskAssessment::new(0.0, Default::default(), vec![], vec![], t0());
        assert!(flag_reason(&v, &a).contains("doctor_id"));

        let v = ValidationOutcome::passed("t", t0());
        let a = RiskAssessment::new(72.0, Default::default(), vec![], vec![], t0());
        assert_eq!(flag_reason(&v, &a), "HIGH risk (score 72.0)");
    }
}
