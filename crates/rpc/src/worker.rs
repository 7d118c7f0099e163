//! Background escalation sweeps

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::context::AppContext;

/// Periodic escalation sweeper
///
/// Runs `AppContext::run_escalation_sweep` every `interval` until shut down.
pub struct EscalationWorker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<u64>,
}

impl EscalationWorker {
    /// Spawn the worker on the current runtime
    pub fn spawn(ctx: Arc<AppContext>, interval: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut sweeps = 0u64;

            info!(interval_ms = interval.as_millis() as u64, "Escalation worker started");
            loop {
                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let report = ctx.run_escalation_sweep().await;
                        sweeps += 1;
                        if report.events.is_empty() {
                            debug!(sweep = sweeps, "No escalations");
                        } else {
                            info!(
                                sweep = sweeps,
                                events = report.events.len(),
                                promoted = report.promoted(),
                                "Escalation sweep fired"
                            );
                        }
                    }
                }
            }
            info!(sweeps, "Escalation worker stopped");
            sweeps
        });

        Self { shutdown, handle }
    }

    /// Stop the worker and wait for it; returns the number of sweeps run
    pub async fn shutdown(self) -> u64 {
        let _ = self.shutdown.send(true);
        match self.handle.await {
            Ok(sweeps) => sweeps,
            Err(e) => {
                warn!(error = %e, "Escalation worker task failed");
                0
            }
        }
    }
}
