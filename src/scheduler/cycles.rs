/*!
 * Scheduler Cycles
 * Queue drain and retention cleanup, run as periodic jobs
 */

use super::queue::{CandidateQueue, HibernationCandidate};
use super::task::PeriodicJob;
use crate::core::errors::{HibernationError, HibernationResult};
use crate::core::types::TabId;
use crate::hibernation::{HibernateOutcome, HibernationEngine};
use crate::policy;
use crate::tab::HibernationReason;
use crate::visibility::VisibilityManager;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one drain cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub examined: usize,
    pub hibernated: Vec<TabId>,
    pub skipped: usize,
    pub failed: Vec<TabId>,
}

/// Turns queued intents into hibernations at a bounded rate
pub struct CandidateScheduler {
    engine: Arc<HibernationEngine>,
    queue: Arc<CandidateQueue>,
    visibility: Arc<VisibilityManager>,
}

impl CandidateScheduler {
    pub fn new(
        engine: Arc<HibernationEngine>,
        queue: Arc<CandidateQueue>,
        visibility: Arc<VisibilityManager>,
    ) -> Self {
        Self {
            engine,
            queue,
            visibility,
        }
    }

    pub fn queue(&self) -> &Arc<CandidateQueue> {
        &self.queue
    }

    /// Queue a tab for later hibernation
    pub fn enqueue(&self, tab_id: TabId, reason: HibernationReason) -> HibernationResult<()> {
        let tab = self
            .engine
            .registry()
            .tab(tab_id)
            .ok_or(HibernationError::TabNotFound(tab_id))?;
        let config = self.engine.config();
        let priority = policy::priority(&tab, self.engine.policy_context().now, &config.weights);

        self.queue
            .push(HibernationCandidate::new(tab_id, reason, priority))?;
        debug!(tab_id, priority, reason = %reason, "Candidate queued");
        Ok(())
    }

    /// Drop queued intents for a tab
    pub fn supersede(&self, tab_id: TabId) -> usize {
        self.queue.remove_tab(tab_id)
    }

    /// Examine at most `per_cycle_cap` ready entries
    pub async fn drain_cycle(&self) -> DrainReport {
        let config = self.engine.config();
        let mut report = DrainReport::default();

        while report.examined < config.per_cycle_cap {
            let Some(candidate) = self.queue.pop_ready(config.min_dwell) else {
                break;
            };
            report.examined += 1;

            if self.visibility.contains(candidate.tab_id) {
                report.skipped += 1;
                continue;
            }

            match self.engine.hibernate(candidate.tab_id, candidate.reason).await {
                Ok(HibernateOutcome::Hibernated(_)) => report.hibernated.push(candidate.tab_id),
                Ok(HibernateOutcome::Declined(why)) => {
                    debug!(tab_id = candidate.tab_id, reason = %why, "Queued candidate skipped");
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(tab_id = candidate.tab_id, error = %e, "Queued hibernation failed");
                    report.failed.push(candidate.tab_id);
                }
            }
        }

        if report.examined > 0 {
            debug!(
                examined = report.examined,
                hibernated = report.hibernated.len(),
                skipped = report.skipped,
                failed = report.failed.len(),
                remaining = self.queue.len(),
                "Drain cycle complete"
            );
        }
        report
    }

    /// Drop memory profiles past retention
    pub fn cleanup_cycle(&self) -> usize {
        self.engine.prune_profiles()
    }
}

/// Periodic queue drain
pub struct DrainJob(pub Arc<CandidateScheduler>);

impl PeriodicJob for DrainJob {
    fn name(&self) -> &'static str {
        "hibernation-queue"
    }

    fn run(&self) -> BoxFuture<'_, HibernationResult<()>> {
        async move {
            self.0.drain_cycle().await;
            Ok(())
        }
        .boxed()
    }
}

/// Periodic retention cleanup
pub struct CleanupJob(pub Arc<CandidateScheduler>);

impl PeriodicJob for CleanupJob {
    fn name(&self) -> &'static str {
        "profile-cleanup"
    }

    fn run(&self) -> BoxFuture<'_, HibernationResult<()>> {
        async move {
            self.0.cleanup_cycle();
            Ok(())
        }
        .boxed()
    }
}
