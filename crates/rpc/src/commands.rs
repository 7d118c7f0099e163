//! CLI commands

use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rxledger_core::Prescription;
use rxledger_hooks::{HookRegistry, StaticIntegration};
use rxledger_ledger::Record;
use rxledger_review::ReviewDecision;

use crate::config::AppConfig;
use crate::context::{AppContext, PipelineError, SubmissionOutcome, SubmissionResult};
use crate::worker::EscalationWorker;

/// Build the pipeline with the default collaborators and the stock integrations
pub fn build_context(config: AppConfig) -> Result<AppContext, anyhow::Error> {
    let mut hooks = HookRegistry::default().with_fail_policy(config.validator_fail_policy);
    hooks.register_integration(Arc::new(StaticIntegration::records()));
    hooks.register_integration(Arc::new(StaticIntegration::insurance()));
    hooks.register_integration(Arc::new(StaticIntegration::inventory()));
    Ok(AppContext::with_hooks(config, hooks)?)
}

/// The four sample prescriptions used by `demo` and `audit`
pub fn sample_prescriptions() -> Vec<Prescription> {
    let date = NaiveDate::from_ymd_opt(2025, 11, 9).unwrap_or_default();
    vec![
        Prescription::new("P001", "Lisinopril")
            .with_patient_name("John Doe")
            .with_patient_age(45)
            .with_dosage("10mg once daily")
            .with_duration("30 days")
            .with_doctor("D101", "Dr. Sarah Smith")
            .with_date_prescribed(date),
        Prescription::new("P002", "Warfarin")
            .with_patient_name("Jane Smith")
            .with_patient_age(62)
            .with_dosage("5mg daily")
            .with_duration("90 days")
            .with_doctor("D102", "Dr. Michael Johnson")
            .with_date_prescribed(date),
        // Missing patient_name, doctor_id, doctor_name
        Prescription::new("P003", "Amoxicillin").with_dosage("500mg three times daily"),
        Prescription::new("P004", "Amoxicillin")
            .with_patient_name("Tommy Wilson")
            .with_patient_age(8)
            .with_dosage("250mg three times daily")
            .with_duration("10 days")
            .with_doctor("D103", "Dr. Emily Chen")
            .with_date_prescribed(date),
    ]
}

fn print_header(title: &str) {
    println!();
    println!("{}", "=".repeat(70));
    println!("  {}", title);
    println!("{}", "=".repeat(70));
}

fn print_result(result: &SubmissionResult) {
    let validation = &result.validation;
    let assessment = &result.assessment;

    println!(
        "{} Validation: {} (confidence {:.2}, by {})",
        if validation.is_valid { "✅" } else { "❌" },
        if validation.is_valid { "passed" } else { "failed" },
        validation.confidence,
        validation.validated_by
    );
    for error in &validation.errors {
        println!("   ❌ {}", error);
    }
    for warning in &validation.warnings {
        println!("   ⚠️  {}", warning);
    }
    println!("   Risk: {} (score {:.1})", assessment.level, assessment.score);
    for factor in &assessment.factors {
        println!("   • {}", factor);
    }

    match &result.outcome {
        SubmissionOutcome::Recorded {
            index,
            hash,
            integrations,
        } => {
            println!(
                "✅ {} → record #{} ({}…)",
                result.decision,
                index,
                &hash[..hash.len().min(16)]
            );
            for outcome in integrations {
                match &outcome.error {
                    None => println!("   ↳ {} ok", outcome.hook),
                    Some(e) => println!("   ↳ {} failed: {}", outcome.hook, e),
                }
            }
        }
        SubmissionOutcome::Queued {
            item_id,
            tier,
            deliveries,
        } => {
            let delivered = deliveries.iter().filter(|d| d.is_delivered()).count();
            println!(
                "🚩 {} → {} queued as {} ({}/{} notifications delivered)",
                result.decision,
                item_id,
                tier,
                delivered,
                deliveries.len()
            );
        }
    }
}

fn print_record(record: &Record) {
    println!("Record #{}", record.index);
    println!("  Timestamp:     {}", record.timestamp.to_rfc3339());
    println!("  Status:        {}", record.report.status);
    if let Some(p) = record.prescription() {
        println!(
            "  Prescription:  {} {} for {}",
            p.medication.as_deref().unwrap_or("-"),
            p.dosage.as_deref().unwrap_or("-"),
            p.patient_id.as_deref().unwrap_or("-")
        );
    }
    if let Some(ref risk) = record.report.risk {
        println!("  Risk:          {} ({:.1})", risk.level, risk.score);
    }
    if record.report.has_warning() {
        println!("  ⚠️  Accepted with risk warning");
    }
    println!("  Previous hash: {}", record.previous_hash);
    println!("  Hash:          {}", record.hash);
}

/// Print the audit outcome; a corrupt chain is an error for the caller
fn report_integrity(audit: Result<(), PipelineError>, records: usize) -> Result<(), anyhow::Error> {
    match audit {
        Ok(()) => {
            println!("✅ Hash chain verified ({} records)", records);
            Ok(())
        }
        Err(e) => {
            println!("❌ Hash chain broken: {}", e);
            Err(e.into())
        }
    }
}

/// Run the sample prescriptions through the pipeline and walk the results
pub async fn demo(ctx: Arc<AppContext>) -> Result<(), anyhow::Error> {
    print_header("PRESCRIPTION LEDGER DEMO");

    let mut flagged = Vec::new();
    for (n, prescription) in sample_prescriptions().into_iter().enumerate() {
        print_header(&format!(
            "SUBMISSION {}: {} for {}",
            n + 1,
            prescription.medication.as_deref().unwrap_or("-"),
            prescription.patient_id.as_deref().unwrap_or("-")
        ));
        let result = ctx.submit(prescription).await?;
        print_result(&result);
        if let Some(id) = result.item_id() {
            flagged.push(id);
        }
    }

    print_header("LEDGER");
    for record in ctx.ledger_records().await {
        print_record(&record);
        println!();
    }

    print_header("INTEGRITY VERIFICATION");
    report_integrity(ctx.audit().await, ctx.ledger_len().await)?;

    print_header("PATIENT HISTORY: P001");
    let history = ctx.patient_history("P001").await;
    println!("Prescriptions for P001: {}", history.len());
    for record in &history {
        if let Some(p) = record.prescription() {
            println!(
                "  • {} - {} - recorded {}",
                p.medication.as_deref().unwrap_or("-"),
                p.dosage.as_deref().unwrap_or("-"),
                record.timestamp.format("%Y-%m-%d")
            );
        }
    }

    print_header("ESCALATION SWEEP (+61 minutes)");
    let report = ctx
        .run_escalation_sweep_at(Utc::now() + Duration::minutes(61))
        .await;
    if report.events.is_empty() {
        println!("No escalations");
    }
    for event in &report.events {
        println!("⏫ {} {} → {} ({})", event.item_id, event.from, event.to, event.reason);
    }

    print_header("REVIEW QUEUE");
    let status = ctx.queue_status().await;
    println!(
        "Pending: {}  Under review: {}  Reviewed: {}  Overdue: {}",
        status.pending, status.under_review, status.total_reviewed, status.overdue
    );
    while let Some(item) = ctx.next_item().await {
        let item = ctx.assign(item.id, "pharmacist-01").await?;
        println!("👤 {} assigned to pharmacist-01 ({})", item.id, item.tier);
        let item = ctx
            .complete_review(
                item.id,
                ReviewDecision::Reject,
                "Incomplete prescription; returned to prescriber",
                "pharmacist-01",
            )
            .await?;
        println!(
            "❌ {} {} after {}s",
            item.id,
            item.state,
            item.review_duration_secs.unwrap_or_default()
        );
    }

    print_header("STATISTICS");
    let stats = ctx.ledger_stats().await;
    println!("Total prescriptions: {}", stats.total_prescriptions);
    println!("Unique patients:     {}", stats.unique_patients);
    println!("Unique prescribers:  {}", stats.unique_prescribers);
    println!("Unique medications:  {}", stats.unique_medications);
    if let Some((medication, count)) = stats.most_prescribed {
        println!("Most prescribed:     {} ({} times)", medication, count);
    }
    println!(
        "Chain status:        {}",
        if stats.chain_valid { "✅ valid" } else { "❌ invalid" }
    );

    let metrics = ctx.metrics();
    println!(
        "Pipeline:            {} submitted, {} accepted, {} with warning, {} flagged",
        metrics.submitted, metrics.accepted, metrics.accepted_with_warning, metrics.flagged
    );
    println!("Flagged items:       {}", flagged.len());

    Ok(())
}

/// Submit a JSON array of prescriptions
///
/// With `sweep`, keeps the escalation worker running until Ctrl-C.
pub async fn submit_file(ctx: Arc<AppContext>, path: &Path, sweep: bool) -> Result<(), anyhow::Error> {
    let content = std::fs::read_to_string(path)?;
    let prescriptions: Vec<Prescription> = serde_json::from_str(&content)?;
    println!("📥 {} prescriptions from {}", prescriptions.len(), path.display());

    for prescription in prescriptions {
        let result = ctx.submit(prescription).await?;
        println!();
        println!("Submission {}", result.submission_id);
        print_result(&result);
    }

    let status = ctx.queue_status().await;
    println!();
    println!(
        "✅ Ledger: {} records | Queue: {} pending, {} overdue",
        ctx.ledger_len().await,
        status.pending,
        status.overdue
    );

    if sweep {
        let interval = ctx.config().sweep_interval();
        let worker = EscalationWorker::spawn(ctx.clone(), interval);
        println!("⏱️  Escalation worker running every {}s (Ctrl-C to stop)", interval.as_secs());
        tokio::signal::ctrl_c().await?;
        let sweeps = worker.shutdown().await;
        println!("✅ Worker stopped after {} sweeps", sweeps);
    }

    Ok(())
}

/// Print the effective configuration
pub fn config(config: &AppConfig) -> Result<(), anyhow::Error> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Build the sample chain, verify it and optionally export it
pub async fn audit(ctx: Arc<AppContext>, export: Option<&Path>) -> Result<(), anyhow::Error> {
    for prescription in sample_prescriptions() {
        ctx.submit(prescription).await?;
    }

    report_integrity(ctx.audit().await, ctx.ledger_len().await)?;

    if let Some(path) = export {
        let written = ctx.export_jsonl(path).await?;
        println!("✅ Exported {} records to {}", written, path.display());
    }

    Ok(())
}
