//! Integration tests for RxLedger
//!
//! These tests drive the complete flow through `AppContext`: validation,
//! scoring, routing, ledger append, review queue, escalation and
//! collaborators.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rxledger_core::{Prescription, RiskAssessment, RiskLevel, RiskSignals, Submission, ValidationOutcome};
use rxledger_hooks::{
    FailPolicy, HookError, HookRegistry, HookResult, NotificationKind, PrescriptionValidator, RecordingGateway,
    RuleBasedValidator, StaticIntegration,
};
use rxledger_ledger::verify_chain;
use rxledger_review::{ReviewDecision, ReviewError, ReviewState, RuleAction, Tier};
use rxledger_rpc::{AppConfig, AppContext, Decision, EscalationWorker, PipelineError, SubmissionOutcome};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 9, 9, 0, 0).unwrap()
}

fn complete(patient: &str, medication: &str, dosage: &str, doctor: &str) -> Prescription {
    Prescription::new(patient, medication)
        .with_patient_name("Test Patient")
        .with_patient_age(45)
        .with_dosage(dosage)
        .with_duration("30 days")
        .with_doctor(doctor, "Dr. Test")
}

fn incomplete(patient: &str) -> Prescription {
    Prescription::new(patient, "Amoxicillin").with_dosage("500mg three times daily")
}

/// Context with a recording gateway, returned alongside for inspection
fn recording_context() -> (AppContext, Arc<RecordingGateway>) {
    let gateway = Arc::new(RecordingGateway::new());
    let mut hooks = HookRegistry::new(Arc::new(RuleBasedValidator::new()));
    hooks.register_gateway(gateway.clone());
    let ctx = AppContext::with_hooks(AppConfig::default(), hooks).unwrap();
    (ctx, gateway)
}

/// Test: fresh subject, ordinary medication → Accept
#[tokio::test]
async fn test_low_risk_submission_is_recorded() {
    let ctx = AppContext::new(AppConfig::default()).unwrap();
    let before = ctx.ledger_len().await;

    let result = ctx
        .submit_at(complete("P001", "Lisinopril", "10mg once daily", "D101"), t0())
        .await
        .unwrap();

    assert_eq!(result.decision, Decision::Accept);
    assert_eq!(result.assessment.level, RiskLevel::Low);
    assert_eq!(ctx.ledger_len().await, before + 1);
    assert!(ctx.verify_integrity().await);

    let history = ctx.patient_history("P001").await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].submission().unwrap().id, result.submission_id);
}

/// Test: missing required fields → Flag, nothing appended
#[tokio::test]
async fn test_invalid_submission_is_queued() {
    let (ctx, gateway) = recording_context();
    let before = ctx.ledger_len().await;

    let result = ctx.submit_at(incomplete("P003"), t0()).await.unwrap();

    assert_eq!(result.decision, Decision::Flag);
    assert!(!result.validation.is_valid);
    assert_eq!(ctx.ledger_len().await, before);

    let (item_id, tier) = match result.outcome {
        SubmissionOutcome::Queued { item_id, tier, .. } => (item_id, tier),
        other => panic!("expected Queued, got {:?}", other),
    };
    // Score 0 is below the critical threshold
    assert_eq!(tier, Tier::High);

    let item = ctx.queue_item(item_id).await.unwrap();
    assert_eq!(item.state, ReviewState::Pending);
    assert_eq!(item.sla_deadline, t0() + Duration::hours(24));

    let sent = gateway.records().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::Flagged);
    assert_eq!(sent[0].item_id, item_id.to_string());
}

/// Test: high-sensitivity medication alone contributes 10 points
#[tokio::test]
async fn test_high_sensitivity_alone_is_accepted() {
    let ctx = AppContext::new(AppConfig::default()).unwrap();
    let result = ctx
        .submit_at(complete("P010", "Oxycodone", "5mg every 6 hours", "D1"), t0())
        .await
        .unwrap();

    assert!((result.assessment.score - 10.0).abs() < 1e-9);
    assert_eq!(result.assessment.signals.high_sensitivity, 100.0);
    assert_eq!(result.decision, Decision::Accept);
}

/// Test: repeated high-sensitivity prescriptions from new doctors escalate to Flag
#[tokio::test]
async fn test_doctor_shopping_is_flagged_critical() {
    let ctx = AppContext::new(AppConfig::default()).unwrap();

    // 10 (sensitivity)
    let first = ctx
        .submit_at(complete("P020", "Oxycodone", "5mg", "D1"), t0())
        .await
        .unwrap();
    assert_eq!(first.decision, Decision::Accept);

    // 2 prescribers (12) + early repeat (15) + sensitivity (10) = 37
    let second = ctx
        .submit_at(complete("P020", "Oxycodone", "5mg", "D2"), t0() + Duration::days(2))
        .await
        .unwrap();
    assert_eq!(second.decision, Decision::AcceptWithWarning);
    assert!((second.assessment.score - 37.0).abs() < 1e-9);

    // 3 prescribers (22.5) + 15 + 10 = 47.5
    let third = ctx
        .submit_at(complete("P020", "Oxycodone", "5mg", "D3"), t0() + Duration::days(4))
        .await
        .unwrap();
    assert_eq!(third.decision, Decision::AcceptWithWarning);

    // frequency 3 (10) + 4 prescribers (30) + 3x dose (20) + 15 + 10 = 85
    let fourth = ctx
        .submit_at(complete("P020", "Oxycodone", "15mg", "D4"), t0() + Duration::days(6))
        .await
        .unwrap();
    assert_eq!(fourth.decision, Decision::Flag);
    assert!((fourth.assessment.score - 85.0).abs() < 1e-9);
    assert_eq!(fourth.assessment.factors.len(), 5);
    match fourth.outcome {
        SubmissionOutcome::Queued { tier, .. } => assert_eq!(tier, Tier::Critical),
        other => panic!("expected Queued, got {:?}", other),
    }

    // Only the three accepted submissions are in the chain
    let history = ctx.patient_history("P020").await;
    assert_eq!(history.len(), 3);
    assert!(!history[0].report.has_warning());
    assert!(history[1].report.has_warning());
    assert!(history[2].report.has_warning());

    // Other subjects are unaffected
    let other = ctx
        .submit_at(complete("P021", "Oxycodone", "15mg", "D4"), t0() + Duration::days(6))
        .await
        .unwrap();
    assert_eq!(other.decision, Decision::Accept);

    let metrics = ctx.metrics();
    assert_eq!(metrics.submitted, 5);
    assert_eq!(metrics.accepted, 2);
    assert_eq!(metrics.accepted_with_warning, 2);
    assert_eq!(metrics.flagged, 1);
}

/// Test: next item is served by tier, then by arrival
#[tokio::test]
async fn test_queue_serves_by_tier() {
    let ctx = AppContext::new(AppConfig::default()).unwrap();
    let assessment = RiskAssessment::new(70.0, RiskSignals::default(), vec![], vec![], t0());

    let mut ids = Vec::new();
    for (n, tier) in [Tier::Moderate, Tier::Critical, Tier::High].into_iter().enumerate() {
        let submission = Submission::at(incomplete(&format!("P10{}", n)), t0());
        let at = t0() + Duration::minutes(n as i64);
        ids.push(ctx.enqueue_at(submission, assessment.clone(), tier, at).await);
    }

    let mut served = Vec::new();
    while let Some(item) = ctx.next_item().await {
        served.push(item.tier);
        ctx.assign_at(item.id, "pharmacist-01", t0() + Duration::minutes(10))
            .await
            .unwrap();
    }
    assert_eq!(served, vec![Tier::Critical, Tier::High, Tier::Moderate]);

    let status = ctx.queue_status_at(t0() + Duration::minutes(10)).await;
    assert_eq!(status.pending, 0);
    assert_eq!(status.under_review, 3);
}

/// Test: Flag → promote → re-alert → assign → complete
#[tokio::test]
async fn test_escalation_and_review_lifecycle() {
    let (ctx, gateway) = recording_context();
    let result = ctx.submit_at(incomplete("P030"), t0()).await.unwrap();
    let id = result.item_id().unwrap();

    // Nothing is due yet
    let report = ctx.run_escalation_sweep_at(t0() + Duration::minutes(30)).await;
    assert!(report.events.is_empty());

    // High for over an hour → Critical
    let promoted_at = t0() + Duration::minutes(61);
    let report = ctx.run_escalation_sweep_at(promoted_at).await;
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.promoted(), 1);
    assert_eq!(report.events[0].from, Tier::High);
    assert_eq!(report.events[0].to, Tier::Critical);
    assert_eq!(report.deliveries.len(), 1);
    assert_eq!(report.deliveries[0].kind, NotificationKind::Escalated);

    // Critical and unassigned for over 15 minutes → re-alert
    let report = ctx
        .run_escalation_sweep_at(promoted_at + Duration::minutes(16))
        .await;
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].action, RuleAction::Realert);
    assert_eq!(report.deliveries[0].kind, NotificationKind::Realert);

    // Re-alert fires once; Critical is never promoted further
    let report = ctx.run_escalation_sweep_at(t0() + Duration::hours(30)).await;
    assert!(report.events.is_empty());

    let item = ctx.queue_item(id).await.unwrap();
    assert_eq!(item.tier, Tier::Critical);
    assert_eq!(item.escalations.len(), 2);
    // SLA deadline is kept from enqueue
    assert_eq!(item.sla_deadline, t0() + Duration::hours(24));

    let assigned = ctx
        .assign_at(id, "pharmacist-01", t0() + Duration::hours(2))
        .await
        .unwrap();
    assert_eq!(assigned.state, ReviewState::UnderReview);

    ctx.add_note(id, "pharmacist-01", "Called prescriber").await.unwrap();

    let done = ctx
        .complete_review_at(
            id,
            ReviewDecision::Reject,
            "Missing prescriber details",
            "pharmacist-01",
            t0() + Duration::hours(2) + Duration::minutes(5),
        )
        .await
        .unwrap();
    assert_eq!(done.state, ReviewState::Rejected);
    assert_eq!(done.review_duration_secs, Some(300));
    assert_eq!(done.notes.len(), 2);

    // Terminal items cannot be reviewed again
    let err = ctx
        .complete_review(id, ReviewDecision::Approve, "", "pharmacist-02")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Review(ReviewError::AlreadyResolved { .. })
    ));

    // Flagged + escalated + re-alert
    assert_eq!(gateway.records().await.len(), 3);
    assert_eq!(ctx.metrics().escalations, 2);
}

/// Test: unknown queue items are reported, not panicked on
#[tokio::test]
async fn test_unknown_queue_item() {
    let ctx = AppContext::new(AppConfig::default()).unwrap();
    let err = ctx
        .assign(rxledger_review::ItemId(42), "pharmacist-01")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Review(ReviewError::UnknownQueueItem(_))
    ));
}

struct OfflineValidator;

#[async_trait]
impl PrescriptionValidator for OfflineValidator {
    fn name(&self) -> &str {
        "Offline"
    }

    async fn validate(&self, _submission: &Submission) -> HookResult<ValidationOutcome> {
        Err(HookError::Timeout(5_000))
    }
}

/// Test: validator failure is fail-closed by default
#[tokio::test]
async fn test_validator_failure_fail_closed() {
    let hooks = HookRegistry::new(Arc::new(OfflineValidator));
    let ctx = AppContext::with_hooks(AppConfig::default(), hooks).unwrap();

    let result = ctx
        .submit_at(complete("P040", "Lisinopril", "10mg", "D1"), t0())
        .await
        .unwrap();
    assert_eq!(result.decision, Decision::Flag);
    assert_eq!(ctx.ledger_len().await, 1);
}

/// Test: fail-open lets a low-risk submission through
#[tokio::test]
async fn test_validator_failure_fail_open() {
    let hooks = HookRegistry::new(Arc::new(OfflineValidator)).with_fail_policy(FailPolicy::FailOpen);
    let ctx = AppContext::with_hooks(AppConfig::default(), hooks).unwrap();

    let result = ctx
        .submit_at(complete("P041", "Lisinopril", "10mg", "D1"), t0())
        .await
        .unwrap();
    assert_eq!(result.decision, Decision::Accept);
    assert_eq!(result.validation.confidence, 0.0);
    assert!(result.validation.has_warnings());
}

/// Test: failed notifications and integrations do not roll back core state
#[tokio::test]
async fn test_collaborator_failures_are_counted() {
    let mut hooks = HookRegistry::new(Arc::new(RuleBasedValidator::new()));
    hooks.register_gateway(Arc::new(RecordingGateway::failing()));
    hooks.register_integration(Arc::new(StaticIntegration::records()));
    let ctx = AppContext::with_hooks(AppConfig::default(), hooks).unwrap();

    let flagged = ctx.submit_at(incomplete("P050"), t0()).await.unwrap();
    assert!(flagged.item_id().is_some());
    assert_eq!(ctx.queue_status_at(t0()).await.pending, 1);
    assert_eq!(ctx.metrics().notifications_failed, 1);

    let accepted = ctx
        .submit_at(complete("P051", "Lisinopril", "10mg", "D1"), t0())
        .await
        .unwrap();
    match accepted.outcome {
        SubmissionOutcome::Recorded { integrations, .. } => {
            assert_eq!(integrations.len(), 1);
            assert!(integrations[0].is_ok());
            assert_eq!(integrations[0].metadata.as_ref().unwrap()["reference"], "EHR-1");
        }
        other => panic!("expected Recorded, got {:?}", other),
    }
}

/// Test: the exported chain verifies on its own
#[tokio::test]
async fn test_export_and_reverify() {
    let ctx = AppContext::new(AppConfig::default()).unwrap();
    for (n, medication) in ["Lisinopril", "Metformin", "Atorvastatin"].iter().enumerate() {
        ctx.submit_at(
            complete(&format!("P06{}", n), medication, "10mg", "D1"),
            t0() + Duration::minutes(n as i64),
        )
        .await
        .unwrap();
    }

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("ledger.jsonl");
    assert_eq!(ctx.export_jsonl(&path).await.unwrap(), 4);

    let records: Vec<rxledger_ledger::Record> = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(verify_chain(&records).is_ok());

    let stats = ctx.ledger_stats().await;
    assert_eq!(stats.total_prescriptions, 3);
    assert_eq!(stats.unique_prescribers, 1);
    assert!(stats.chain_valid);
}

/// Test: background worker promotes overdue items
#[tokio::test]
async fn test_worker_sweeps_in_background() {
    let (ctx, gateway) = recording_context();
    let ctx = Arc::new(ctx);

    let result = ctx
        .submit_at(incomplete("P070"), Utc::now() - Duration::hours(2))
        .await
        .unwrap();
    let id = result.item_id().unwrap();

    let worker = EscalationWorker::spawn(ctx.clone(), StdDuration::from_millis(10));
    tokio::time::sleep(StdDuration::from_millis(50)).await;
    let sweeps = worker.shutdown().await;

    assert!(sweeps >= 1);
    let item = ctx.queue_item(id).await.unwrap();
    assert_eq!(item.tier, Tier::Critical);
    assert!(gateway
        .records()
        .await
        .iter()
        .any(|d| d.kind == NotificationKind::Escalated));
}

/// Test: concurrent submissions keep the chain linked
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions() {
    let ctx = Arc::new(AppContext::new(AppConfig::default()).unwrap());

    let mut handles = Vec::new();
    for n in 0..16 {
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            ctx.submit(complete(&format!("P2{:02}", n), "Lisinopril", "10mg", "D1"))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().decision, Decision::Accept);
    }

    assert_eq!(ctx.ledger_len().await, 17);
    assert!(ctx.audit().await.is_ok());
}

/// Test: extreme dosage text is scored without aborting the submission
#[tokio::test]
async fn test_extreme_dosages_do_not_abort_pipeline() {
    let ctx = AppContext::new(AppConfig::default()).unwrap();
    let huge = "79228162514264337593543950335mg";

    for n in 0..3 {
        let result = ctx
            .submit_at(complete("P080", "Lisinopril", huge, "D1"), t0() + Duration::days(40 * n))
            .await
            .unwrap();
        assert!(result.decision.is_accepted());
    }

    ctx.submit_at(
        complete("P081", "Lisinopril", "0.0000000000000000000000000001mg", "D1"),
        t0(),
    )
    .await
    .unwrap();
    let result = ctx
        .submit_at(complete("P081", "Lisinopril", "100mg", "D1"), t0() + Duration::days(40))
        .await
        .unwrap();
    assert_eq!(result.assessment.signals.dosage_escalation, 100.0);
    assert!(ctx.verify_integrity().await);
}
