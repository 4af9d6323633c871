/*!
 * Periodic Task - Background Cycle Runner
 *
 * Drives one `PeriodicJob` on a fixed interval. Each spawned task listens to
 * its own command channel plus a shutdown signal shared by every task the
 * engine owns, checked between cycles.
 *
 * # Graceful-with-Fallback Shutdown
 *
 * 1. **Preferred:** `shutdown().await` sends `Shutdown` and awaits the handle.
 * 2. **Fallback:** `Drop` aborts the task and logs a warning.
 *
 * A failing or panicking cycle is logged and skipped; the next tick retries.
 */

use crate::core::errors::HibernationResult;
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{error, info, warn};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Unit of periodic background work
pub trait PeriodicJob: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Run one cycle
    fn run(&self) -> BoxFuture<'_, HibernationResult<()>>;
}

/// Control messages for a periodic task
#[derive(Debug, Clone)]
pub enum TaskCommand {
    /// Replace the interval; the next cycle runs one full period from now
    UpdateInterval(Duration),
    Pause,
    Resume,
    /// Run a cycle immediately
    Trigger,
    Shutdown,
}

/// Handle to a spawned periodic task
pub struct PeriodicTask {
    name: &'static str,
    command_tx: mpsc::UnboundedSender<TaskCommand>,
    handle: Option<tokio::task::JoinHandle<()>>,
    shutdown_initiated: Arc<AtomicBool>,
    cycles: Arc<AtomicU64>,
}

impl PeriodicTask {
    /// Spawn `job` on `period`, stopping when `shutdown` becomes true
    pub fn spawn(
        job: Arc<dyn PeriodicJob>,
        period: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let cycles = Arc::new(AtomicU64::new(0));
        let name = job.name();

        let handle = tokio::spawn(run_task_loop(job, period, command_rx, shutdown, cycles.clone()));

        info!("Periodic task '{}' spawned with {:?} interval", name, period);

        Self {
            name,
            command_tx,
            handle: Some(handle),
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            cycles,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Completed cycles, including failed ones
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    pub fn update_interval(&self, period: Duration) {
        let _ = self.command_tx.send(TaskCommand::UpdateInterval(period));
    }

    pub fn pause(&self) {
        let _ = self.command_tx.send(TaskCommand::Pause);
    }

    pub fn resume(&self) {
        let _ = self.command_tx.send(TaskCommand::Resume);
    }

    pub fn trigger(&self) {
        let _ = self.command_tx.send(TaskCommand::Trigger);
    }

    /// Stop the task and wait for the in-flight cycle to finish
    pub async fn shutdown(mut self) {
        self.shutdown_initiated.store(true, Ordering::SeqCst);
        let _ = self.command_tx.send(TaskCommand::Shutdown);

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Periodic task '{}' shutdown error: {}", self.name, e);
            } else {
                info!("Periodic task '{}' shutdown complete", self.name);
            }
        }
    }
}

fn new_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn run_task_loop(
    job: Arc<dyn PeriodicJob>,
    period: Duration,
    mut command_rx: mpsc::UnboundedReceiver<TaskCommand>,
    mut shutdown: watch::Receiver<bool>,
    cycles: Arc<AtomicU64>,
) {
    let mut active = true;
    let mut interval = new_interval(period);

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = interval.tick() => {
                if active {
                    run_cycle(job.as_ref(), &cycles).await;
                }
            }

            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }

            cmd = command_rx.recv() => {
                match cmd {
                    Some(TaskCommand::UpdateInterval(period)) => {
                        info!("Periodic task '{}' interval updated: {:?}", job.name(), period);
                        interval = new_interval(period);
                    }
                    Some(TaskCommand::Pause) => {
                        info!("Periodic task '{}' paused", job.name());
                        active = false;
                    }
                    Some(TaskCommand::Resume) => {
                        info!("Periodic task '{}' resumed", job.name());
                        active = true;
                    }
                    Some(TaskCommand::Trigger) => {
                        run_cycle(job.as_ref(), &cycles).await;
                    }
                    Some(TaskCommand::Shutdown) | None => break,
                }
            }
        }
    }

    info!("Periodic task '{}' stopped", job.name());
}

async fn run_cycle(job: &dyn PeriodicJob, cycles: &AtomicU64) {
    match AssertUnwindSafe(job.run()).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Periodic task '{}' cycle failed: {}", job.name(), e),
        Err(_) => error!("Periodic task '{}' cycle panicked, retrying next tick", job.name()),
    }
    cycles.fetch_add(1, Ordering::Relaxed);
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if self.shutdown_initiated.load(Ordering::SeqCst) {
            return;
        }

        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                warn!(
                    "PeriodicTask '{}' dropped without calling shutdown() - aborting task. \
                     Use `task.shutdown().await` for graceful cleanup.",
                    self.name
                );
            }
            handle.abort();
        }
    }
}
