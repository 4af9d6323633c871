/*!
 * Optimization & Pressure Reaction
 *
 * Sweep triggers owned by the orchestrator: on-demand optimize, the periodic
 * optimize pass, and resource samples from the monitor. Statistics are
 * published after every sweep and on every optimize tick.
 */

use super::manager::ManagerInner;
use crate::core::errors::{HibernationError, HibernationResult};
use crate::core::types::{now, Size, TabId};
use crate::hibernation::{SweepKind, SweepReport};
use crate::monitoring::{HibernationStats, ResourceSample, TabEvent};
use crate::scheduler::PeriodicJob;
use crate::tab::HibernationReason;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Summary returned by `optimize_now`
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub tabs_affected: usize,
    pub memory_delta: Size,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub duration: Duration,
    pub success: bool,
    pub hibernated: Vec<TabId>,
    pub failures: Vec<TabId>,
}

impl From<SweepReport> for OptimizationResult {
    fn from(report: SweepReport) -> Self {
        Self {
            tabs_affected: report.hibernated.len(),
            memory_delta: report.memory_freed,
            duration: report.duration,
            success: report.success(),
            hibernated: report.hibernated,
            failures: report.failed,
        }
    }
}

impl ManagerInner {
    /// Aggregate statistics as of now
    pub(crate) fn stats(&self) -> HibernationStats {
        let registry = self.engine.registry();
        let (resident, hibernated, errored) = registry.state_counts();

        let mut stats = self.engine.stats().snapshot(now());
        stats.total_tabs = resident + hibernated + errored;
        stats.resident_tabs = resident;
        stats.hibernated_tabs = hibernated;
        stats.errored_tabs = errored;
        stats.active_tab = registry.active_tab();
        stats.window_len = self.visibility.len();
        stats.window_capacity = self.visibility.capacity();
        stats.queue_len = self.scheduler.queue().len();
        stats.tracked_profiles = registry.profile_count();
        stats.under_pressure = self.engine.is_under_pressure();
        stats.finalize()
    }

    pub(crate) fn publish_stats(&self) -> HibernationStats {
        let stats = self.stats();
        self.engine.events().emit(TabEvent::StatsUpdated(stats.clone()));
        stats
    }

    /// On-demand sweep
    pub(crate) async fn optimize(&self, aggressive: bool) -> OptimizationResult {
        let config = self.config.load_full();
        let (kind, cap) = if aggressive {
            (SweepKind::Aggressive, config.aggressive_batch)
        } else {
            (SweepKind::Optimize, config.optimize_batch)
        };

        let report = self
            .engine
            .sweep(kind, HibernationReason::Manual, cap, &self.visibility.member_set())
            .await;
        self.engine.stats().inc_optimize_passes();
        self.forget_hibernated(&report);
        self.publish_stats();

        OptimizationResult::from(report)
    }

    /// Periodic pass: sweep only when tabs outnumber the window multiple
    pub(crate) async fn optimize_tick(&self) -> Option<SweepReport> {
        let config = self.config.load_full();
        let stats = self.stats();

        let report = if stats.exceeds_window(config.optimize_tab_multiple) {
            debug!(
                total_tabs = stats.total_tabs,
                window_capacity = stats.window_capacity,
                "Tab count exceeds window multiple, optimizing"
            );
            let report = self
                .engine
                .sweep(
                    SweepKind::Optimize,
                    HibernationReason::Automatic,
                    config.optimize_batch,
                    &self.visibility.member_set(),
                )
                .await;
            self.engine.stats().inc_optimize_passes();
            self.forget_hibernated(&report);
            Some(report)
        } else {
            None
        };

        self.publish_stats();
        report
    }

    /// React to one resource sample
    ///
    /// High pressure sets the flag and sweeps immediately, bypassing the
    /// queue dwell. A normal sample clears the flag.
    pub(crate) async fn handle_sample(&self, sample: ResourceSample) -> Option<SweepReport> {
        let config = self.config.load_full();

        if !sample.pressure(&config.thresholds).is_high() {
            self.engine.set_memory_pressure(false);
            return None;
        }

        self.engine.set_memory_pressure(true);
        let report = self
            .engine
            .sweep(
                SweepKind::Pressure,
                HibernationReason::MemoryPressure,
                config.pressure_batch,
                &self.visibility.member_set(),
            )
            .await;
        self.forget_hibernated(&report);
        self.publish_stats();
        Some(report)
    }

    /// Sample the monitor once; an unavailable monitor degrades to time-only sweeps
    pub(crate) async fn poll_monitor(&self) -> HibernationResult<()> {
        match self.monitor.sample() {
            Ok(sample) => {
                if self.monitor_degraded.swap(false, Ordering::AcqRel) {
                    info!("Resource monitor available again");
                }
                self.handle_sample(sample).await;
                Ok(())
            }
            Err(HibernationError::ResourceMonitorUnavailable(detail)) => {
                if !self.monitor_degraded.swap(true, Ordering::AcqRel) {
                    warn!(
                        detail = %detail,
                        "Resource monitor unavailable, pressure-triggered sweeps disabled"
                    );
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Swept tabs leave the window and the queue
    fn forget_hibernated(&self, report: &SweepReport) {
        for &id in &report.hibernated {
            self.visibility.remove(id);
            self.scheduler.supersede(id);
        }
    }
}

/// Periodic optimize pass and steady stats cadence
pub(crate) struct OptimizeJob(pub Arc<ManagerInner>);

impl PeriodicJob for OptimizeJob {
    fn name(&self) -> &'static str {
        "optimize"
    }

    fn run(&self) -> BoxFuture<'_, HibernationResult<()>> {
        async move {
            self.0.optimize_tick().await;
            Ok(())
        }
        .boxed()
    }
}

/// Resource monitor polling
pub(crate) struct MonitorJob(pub Arc<ManagerInner>);

impl PeriodicJob for MonitorJob {
    fn name(&self) -> &'static str {
        "resource-monitor"
    }

    fn run(&self) -> BoxFuture<'_, HibernationResult<()>> {
        self.0.poll_monitor().boxed()
    }
}
