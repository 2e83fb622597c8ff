// Expiration sweeper: the periodic trigger for timeout and opt-in
// autopicks, and for derby timeouts.
//
// Deadlines are plain timestamps in the store, so a restarted process picks
// up expired drafts on its first sweep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use draftroom_core::clock::Clock;
use draftroom_core::model::DraftId;
use draftroom_core::store::Database;
use draftroom_core::DraftResult;
use futures_util::stream::{self, StreamExt};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::derby::DerbyWorkflow;
use crate::runtime::DraftRuntime;

/// Counters for one sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub drafts_due: usize,
    pub autopicks: usize,
    pub derby_timeouts: usize,
    pub failures: usize,
}

pub struct ExpirationSweeper {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    runtime: Arc<DraftRuntime>,
    derby: Arc<DerbyWorkflow>,
    max_concurrent: usize,
    running: AtomicBool,
}

/// Clears the in-flight flag when a sweep ends, including on panic.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ExpirationSweeper {
    pub fn new(
        db: Arc<Database>,
        clock: Arc<dyn Clock>,
        runtime: Arc<DraftRuntime>,
        derby: Arc<DerbyWorkflow>,
        max_concurrent: usize,
    ) -> Self {
        ExpirationSweeper {
            db,
            clock,
            runtime,
            derby,
            max_concurrent: max_concurrent.max(1),
            running: AtomicBool::new(false),
        }
    }

    /// Run one sweep. Returns `None` without doing anything if another
    /// sweep is still in flight.
    ///
    /// Each due draft gets at most one autopick per sweep, and a draft id
    /// appears at most once in a sweep, so a draft is never advanced twice
    /// concurrently. Failures are logged per draft and never stop the rest
    /// of the sweep.
    pub async fn sweep_once(&self) -> Option<SweepReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Sweep already in flight, skipping");
            return None;
        }
        let _guard = SweepGuard(&self.running);

        let mut report = SweepReport::default();
        let now = self.clock.now();

        match self.db.read(|tx| tx.drafts_due_for_autopick(now)) {
            Ok(due) => {
                report.drafts_due = due.len();
                let results: Vec<(DraftId, DraftResult<bool>)> = stream::iter(due)
                    .map(|draft_id| async move {
                        let result = self
                            .runtime
                            .auto_pick(draft_id)
                            .await
                            .map(|outcome| outcome.is_some());
                        (draft_id, result)
                    })
                    .buffer_unordered(self.max_concurrent)
                    .collect()
                    .await;
                for (draft_id, result) in results {
                    match result {
                        Ok(true) => report.autopicks += 1,
                        Ok(false) => {}
                        Err(e) => {
                            report.failures += 1;
                            warn!("Autopick failed for draft {}: {}", draft_id, e);
                        }
                    }
                }
            }
            Err(e) => {
                report.failures += 1;
                warn!("Failed to load drafts due for autopick: {:#}", e);
            }
        }

        match self.db.read(|tx| tx.drafts_with_active_derby()) {
            Ok(derbies) => {
                let expired = derbies.into_iter().filter(|d| {
                    d.derby
                        .deadline
                        .is_some_and(|deadline| now >= deadline)
                });
                for draft in expired {
                    match self.derby.handle_timeout(draft.id).await {
                        Ok(Some(_)) => report.derby_timeouts += 1,
                        Ok(None) => {}
                        Err(e) => {
                            report.failures += 1;
                            warn!("Derby timeout failed for draft {}: {}", draft.id, e);
                        }
                    }
                }
            }
            Err(e) => {
                report.failures += 1;
                warn!("Failed to load active derbies: {:#}", e);
            }
        }

        if report.autopicks + report.derby_timeouts + report.failures > 0 {
            info!(
                "Sweep: {} due, {} autopicks, {} derby timeouts, {} failures",
                report.drafts_due, report.autopicks, report.derby_timeouts, report.failures
            );
        }
        Some(report)
    }

    /// Sweep every `period` until the task is cancelled. Each tick spawns a
    /// sweep; ticks that land while a sweep is running are dropped.
    pub async fn run(self: Arc<Self>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Expiration sweeper running every {:?}", period);
        loop {
            interval.tick().await;
            let sweeper = Arc::clone(&self);
            tokio::spawn(async move {
                sweeper.sweep_once().await;
            });
        }
    }
}
