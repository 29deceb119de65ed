//! the scheduled maintenance cycle.
//!
//! one cycle pushes due cross-signs, pulls every replication source, then
//! appends an attestation if one is scheduled. `run-tasks` runs a single
//! cycle; `serve` can run it in the background.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::{CrossSignReport, LedgerContext};

/// what one cycle did.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// cross-sign outcome, `None` if another run held the scheduler.
    pub cross_sign: Option<CrossSignReport>,
    /// entries appended to mirrors.
    pub replicated: usize,
    /// sources whose pull failed.
    pub replication_failures: usize,
    /// whether an attestation was appended.
    pub attested: bool,
}

/// runs the scheduled cycle against one context.
#[derive(Clone)]
pub struct ScheduledTasks {
    ctx: LedgerContext,
}

impl ScheduledTasks {
    pub(crate) fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// run one cycle. failures are logged; each step runs regardless of the
    /// previous one.
    pub async fn run_once(&self) -> CycleReport {
        let mut report = CycleReport {
            cross_sign: self.ctx.cross_signer().run_due().await,
            ..Default::default()
        };

        let pulled = self.ctx.replica_sync().pull_all().await;
        report.replicated = pulled.appended;
        report.replication_failures = pulled.failed;

        match self.ctx.attestor().run_if_scheduled().await {
            Ok(entry) => report.attested = entry.is_some(),
            Err(e) if e.is_security_violation() => {
                error!(error = %e, "attestation rejected")
            }
            Err(e) => warn!(error = %e, "attestation failed"),
        }

        report
    }

    /// spawn the background cycle.
    ///
    /// runs every `interval`; a cycle that overruns delays the next tick.
    pub fn spawn(self, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_secs = interval.as_secs(),
                "starting scheduled tasks"
            );

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let report = self.run_once().await;
                if report.replicated > 0 || report.attested {
                    info!(
                        replicated = report.replicated,
                        attested = report.attested,
                        "scheduled cycle completed"
                    );
                }
            }
        })
    }
}
