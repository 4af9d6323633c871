/*!
 * Tab Manager
 *
 * Single entry point for the surrounding application. Routes lifecycle and
 * activation calls across the engine, the visibility window and the candidate
 * queue, and owns the background tasks from `start()` until `shutdown()`.
 */

use super::optimize::{MonitorJob, OptimizationResult, OptimizeJob};
use crate::core::config::HibernationConfig;
use crate::core::errors::{HibernationError, HibernationResult};
use crate::core::types::{Size, TabId};
use crate::hibernation::{ActivationReport, HibernateOutcome, HibernationEngine, ReactivationReport, SweepReport};
use crate::monitoring::{HibernationStats, ResourceMonitor, ResourceSample, TabEvent};
use crate::scheduler::{CandidateScheduler, CleanupJob, DrainJob, DrainReport, PeriodicTask};
use crate::tab::{HibernationReason, Tab, TabContent, TabState};
use crate::visibility::VisibilityManager;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

/// State shared with background jobs
pub(crate) struct ManagerInner {
    pub(crate) config: Arc<ArcSwap<HibernationConfig>>,
    pub(crate) engine: Arc<HibernationEngine>,
    pub(crate) scheduler: Arc<CandidateScheduler>,
    pub(crate) visibility: Arc<VisibilityManager>,
    pub(crate) monitor: Arc<dyn ResourceMonitor>,
    pub(crate) monitor_degraded: AtomicBool,
}

struct RunningTasks {
    drain: PeriodicTask,
    cleanup: PeriodicTask,
    optimize: PeriodicTask,
    monitor: PeriodicTask,
}

impl RunningTasks {
    fn retune(&self, config: &HibernationConfig) {
        self.drain.update_interval(config.queue_interval);
        self.cleanup.update_interval(config.cleanup_interval);
        self.optimize.update_interval(config.optimize_interval);
        self.monitor.update_interval(config.monitor_interval);
    }

    async fn shutdown(self) {
        self.drain.shutdown().await;
        self.cleanup.shutdown().await;
        self.optimize.shutdown().await;
        self.monitor.shutdown().await;
    }
}

/// Hibernation orchestrator
pub struct TabManager {
    inner: Arc<ManagerInner>,
    tasks: Mutex<Option<RunningTasks>>,
    shutdown_tx: watch::Sender<bool>,
    shutting_down: AtomicBool,
}

impl TabManager {
    pub(crate) fn from_parts(inner: ManagerInner) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(inner),
            tasks: Mutex::new(None),
            shutdown_tx,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Spawn the background cycles; requires a tokio runtime
    pub fn start(&self) -> HibernationResult<()> {
        self.ensure_running()?;

        let mut tasks = self.tasks.lock();
        if tasks.is_some() {
            return Ok(());
        }

        let config = self.inner.config.load_full();
        let scheduler = self.inner.scheduler.clone();
        let shutdown = || self.shutdown_tx.subscribe();

        *tasks = Some(RunningTasks {
            drain: PeriodicTask::spawn(
                Arc::new(DrainJob(scheduler.clone())),
                config.queue_interval,
                shutdown(),
            ),
            cleanup: PeriodicTask::spawn(
                Arc::new(CleanupJob(scheduler)),
                config.cleanup_interval,
                shutdown(),
            ),
            optimize: PeriodicTask::spawn(
                Arc::new(OptimizeJob(self.inner.clone())),
                config.optimize_interval,
                shutdown(),
            ),
            monitor: PeriodicTask::spawn(
                Arc::new(MonitorJob(self.inner.clone())),
                config.monitor_interval,
                shutdown(),
            ),
        });

        info!("Tab manager started");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.tasks.lock().is_some()
    }

    /// Stop timers first, then release every resident tab's content
    ///
    /// Returns the number of contents released. Later calls are no-ops.
    pub async fn shutdown(&self) -> usize {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            return 0;
        }

        let _ = self.shutdown_tx.send(true);
        let tasks = self.tasks.lock().take();
        if let Some(tasks) = tasks {
            tasks.shutdown().await;
        }

        self.inner.scheduler.queue().clear();
        let disposed = self.inner.engine.dispose_all().await;
        info!(disposed, "Tab manager shut down");
        disposed
    }

    fn ensure_running(&self) -> HibernationResult<()> {
        if self.shutting_down.load(Ordering::Acquire) {
            Err(HibernationError::ShuttingDown)
        } else {
            Ok(())
        }
    }

    pub fn register_tab(&self, tab: Tab, content: Box<dyn TabContent>) -> HibernationResult<()> {
        self.ensure_running()?;
        self.inner.engine.register(tab, content)
    }

    /// Close a tab; any snapshot is discarded and its savings released
    pub async fn unregister_tab(&self, id: TabId) -> HibernationResult<Tab> {
        self.ensure_running()?;
        let tab = self.inner.engine.unregister(id).await?;
        self.inner.scheduler.supersede(id);
        self.inner.visibility.remove(id);
        Ok(tab)
    }

    /// Focus a tab: reactivate if needed, then slide the window
    ///
    /// Tabs pushed out of the window are queued as automatic candidates.
    pub async fn activate_tab(&self, id: TabId) -> HibernationResult<ActivationReport> {
        self.ensure_running()?;
        let report = self.inner.engine.activate(id).await?;

        self.inner.scheduler.supersede(id);
        let update = self.inner.visibility.touch(id);
        // A concurrent unregister may have removed the tab after activation
        if !self.inner.engine.registry().contains(id) {
            self.inner.visibility.remove(id);
        }
        for evicted in update.evicted {
            if let Err(e) = self
                .inner
                .scheduler
                .enqueue(evicted, HibernationReason::Automatic)
            {
                warn!(tab_id = evicted, error = %e, "Could not queue evicted tab");
            }
        }

        Ok(report)
    }

    /// Manual hibernation, bypassing the queue
    pub async fn request_hibernate(
        &self,
        id: TabId,
        reason: HibernationReason,
    ) -> HibernationResult<HibernateOutcome> {
        self.ensure_running()?;
        let outcome = self.inner.engine.hibernate(id, reason).await?;
        if outcome.is_hibernated() {
            self.inner.scheduler.supersede(id);
            self.inner.visibility.remove(id);
        }
        Ok(outcome)
    }

    /// Queue a tab for hibernation after the dwell time
    pub fn schedule_hibernate(&self, id: TabId, reason: HibernationReason) -> HibernationResult<()> {
        self.ensure_running()?;
        self.inner.scheduler.enqueue(id, reason)
    }

    /// Manual reactivation without changing the active tab
    pub async fn request_reactivate(&self, id: TabId) -> HibernationResult<ReactivationReport> {
        self.ensure_running()?;
        self.inner.engine.reactivate(id).await
    }

    pub async fn mark_loading(&self, id: TabId) -> HibernationResult<()> {
        self.ensure_running()?;
        self.inner.engine.mark_loading(id).await
    }

    pub async fn mark_loaded(&self, id: TabId) -> HibernationResult<()> {
        self.ensure_running()?;
        self.inner.engine.mark_loaded(id).await
    }

    /// Retry an errored tab with fresh content
    pub async fn reset_error(&self, id: TabId) -> HibernationResult<()> {
        self.ensure_running()?;
        self.inner.engine.reset_error(id).await
    }

    pub async fn optimize_now(&self, aggressive: bool) -> HibernationResult<OptimizationResult> {
        self.ensure_running()?;
        Ok(self.inner.optimize(aggressive).await)
    }

    /// Feed a resource sample, as the monitor task does
    ///
    /// Samples are ignored once shutdown has begun.
    pub async fn handle_resource_sample(&self, sample: ResourceSample) -> Option<SweepReport> {
        if self.ensure_running().is_err() {
            return None;
        }
        self.inner.handle_sample(sample).await
    }

    /// Poll the configured monitor once
    pub async fn poll_resource_monitor(&self) -> HibernationResult<()> {
        self.ensure_running()?;
        self.inner.poll_monitor().await
    }

    pub fn clear_memory_pressure(&self) {
        self.inner.engine.set_memory_pressure(false);
    }

    pub fn is_under_pressure(&self) -> bool {
        self.inner.engine.is_under_pressure()
    }

    /// Whether the monitor reported itself unavailable
    pub fn is_monitor_degraded(&self) -> bool {
        self.inner.monitor_degraded.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> HibernationStats {
        self.inner.stats()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TabEvent> {
        self.inner.engine.events().subscribe()
    }

    pub fn hibernated_count(&self) -> usize {
        self.inner.engine.registry().hibernated_count()
    }

    pub fn memory_saved(&self) -> Size {
        self.inner.engine.memory_saved()
    }

    pub fn tab_state(&self, id: TabId) -> Option<TabState> {
        self.inner.engine.registry().state(id)
    }

    pub fn tab(&self, id: TabId) -> Option<Tab> {
        self.inner.engine.registry().tab(id)
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.inner.engine.registry().tabs()
    }

    pub fn active_tab(&self) -> Option<TabId> {
        self.inner.engine.registry().active_tab()
    }

    /// Visible window, most recent first
    pub fn window(&self) -> Vec<TabId> {
        self.inner.visibility.members()
    }

    pub fn queued_candidates(&self) -> usize {
        self.inner.scheduler.queue().len()
    }

    pub fn config(&self) -> Arc<HibernationConfig> {
        self.inner.config.load_full()
    }

    /// Swap in a new configuration and retune running tasks
    pub fn update_config(&self, config: HibernationConfig) -> HibernationResult<()> {
        config.validate()?;

        self.inner.scheduler.queue().set_capacity(config.queue_capacity);
        let evicted = self.inner.visibility.set_capacity(config.window_capacity());
        if let Some(tasks) = self.tasks.lock().as_ref() {
            tasks.retune(&config);
        }
        self.inner.config.store(Arc::new(config));

        for id in evicted {
            if let Err(e) = self.inner.scheduler.enqueue(id, HibernationReason::Automatic) {
                warn!(tab_id = id, error = %e, "Could not queue evicted tab");
            }
        }

        info!("Configuration updated");
        Ok(())
    }

    /// Run one queue drain cycle now, outside the timer
    pub async fn drain_queue_now(&self) -> DrainReport {
        self.inner.scheduler.drain_cycle().await
    }

    /// Ask the running drain task for an extra cycle
    pub fn trigger_drain(&self) {
        if let Some(tasks) = self.tasks.lock().as_ref() {
            tasks.drain.trigger();
        }
    }
}
