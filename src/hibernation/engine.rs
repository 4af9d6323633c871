/*!
 * Hibernation Engine
 *
 * Owns every tab state transition. Hibernate and reactivate run under the
 * tab's transition guard so they never overlap for the same tab; different
 * tabs transform independently.
 *
 * Registry mutations always land before the matching event is emitted.
 */

use super::profile::{MemoryProfile, SizeEstimator};
use super::snapshot::HibernatedSnapshot;
use crate::core::config::HibernationConfig;
use crate::core::errors::{ContentError, HibernationError, HibernationResult};
use crate::core::types::{now, Size, TabId};
use crate::monitoring::{transform_span, AtomicHibernationStats, EventBroadcaster, TabEvent};
use crate::policy::{self, IneligibleReason, PolicyContext};
use crate::tab::registry::{TabSlot, TransitionGuard};
use crate::tab::{
    ContentFactory, HibernationReason, PreservationLevel, Tab, TabContent, TabRegistry, TabState,
};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Instrument};

/// Result of a completed hibernation
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HibernationReport {
    pub tab_id: TabId,
    pub reason: HibernationReason,
    pub level: PreservationLevel,
    pub memory_freed: Size,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub duration: Duration,
}

/// Hibernation requests either complete or are declined by policy
#[derive(Debug, Clone, PartialEq)]
pub enum HibernateOutcome {
    Hibernated(HibernationReport),
    Declined(IneligibleReason),
}

impl HibernateOutcome {
    pub fn is_hibernated(&self) -> bool {
        matches!(self, Self::Hibernated(_))
    }

    pub fn memory_freed(&self) -> Size {
        match self {
            Self::Hibernated(report) => report.memory_freed,
            Self::Declined(_) => 0,
        }
    }
}

/// Result of a completed reactivation
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactivationReport {
    pub tab_id: TabId,
    pub memory_restored: Size,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub duration: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub time_hibernated: Duration,
}

/// Result of making a tab the active one
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationReport {
    pub tab_id: TabId,
    pub previous: Option<TabId>,
    pub reactivated: Option<ReactivationReport>,
}

/// Performs hibernate / reactivate transforms over the registry
pub struct HibernationEngine {
    registry: Arc<TabRegistry>,
    factory: Arc<dyn ContentFactory>,
    estimator: Arc<dyn SizeEstimator>,
    config: Arc<ArcSwap<HibernationConfig>>,
    stats: Arc<AtomicHibernationStats>,
    events: EventBroadcaster,
    under_pressure: AtomicBool,
}

impl HibernationEngine {
    pub fn new(
        registry: Arc<TabRegistry>,
        factory: Arc<dyn ContentFactory>,
        estimator: Arc<dyn SizeEstimator>,
        config: Arc<ArcSwap<HibernationConfig>>,
        events: EventBroadcaster,
    ) -> Self {
        Self {
            registry,
            factory,
            estimator,
            config,
            stats: Arc::new(AtomicHibernationStats::new()),
            events,
            under_pressure: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<TabRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<AtomicHibernationStats> {
        &self.stats
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    pub fn config(&self) -> Arc<HibernationConfig> {
        self.config.load_full()
    }

    /// Running total of estimated memory held back by hibernated tabs
    pub fn memory_saved(&self) -> Size {
        self.stats.memory_saved()
    }

    pub fn is_under_pressure(&self) -> bool {
        self.under_pressure.load(Ordering::Acquire)
    }

    /// Set the pressure flag; returns whether it changed
    pub fn set_memory_pressure(&self, active: bool) -> bool {
        let previous = self.under_pressure.swap(active, Ordering::AcqRel);
        if previous == active {
            return false;
        }

        if active {
            warn!("Memory pressure detected");
        } else {
            info!("Memory pressure cleared");
        }
        self.events.emit(TabEvent::PressureChanged { active });
        true
    }

    /// Inputs for policy decisions as of now
    pub fn policy_context(&self) -> PolicyContext {
        PolicyContext::new(now(), self.registry.active_tab(), self.is_under_pressure())
    }

    /// Add a resident tab
    pub fn register(&self, tab: Tab, content: Box<dyn TabContent>) -> HibernationResult<()> {
        let id = tab.id;
        if !tab.state().is_resident() {
            return Err(HibernationError::InvalidState {
                id,
                state: tab.state().to_string(),
                detail: "only normal or loading tabs can be registered".to_string(),
            });
        }

        if !self.registry.insert(tab, content) {
            return Err(HibernationError::AlreadyRegistered(id));
        }

        debug!(tab_id = id, "Tab registered");
        Ok(())
    }

    /// Remove a tab, releasing its content or discarding its snapshot
    ///
    /// Returns the final descriptor with any hibernated fields restored.
    pub async fn unregister(&self, id: TabId) -> HibernationResult<Tab> {
        let (slot, mut guard) = self.acquire(id).await?;

        self.registry.remove(id);
        self.registry.clear_active_if(id);

        if let Some(mut content) = guard.take() {
            let timeout = self.config.load().transform_timeout;
            if let Err(e) = bounded(id, "dispose", timeout, content.dispose()).await {
                warn!(tab_id = id, error = %e, "Content disposal failed during unregister");
            }
        }

        let mut tab = slot.snapshot();
        if let Some(snapshot) = self.registry.take_snapshot(id) {
            self.stats.sub_memory_saved(snapshot.memory_bytes());
            snapshot.restore_onto(&mut tab);
        }
        self.registry.remove_profile(id);

        debug!(tab_id = id, state = %tab.state(), "Tab unregistered");
        Ok(tab)
    }

    /// Hibernate a tab if policy allows it
    pub async fn hibernate(
        &self,
        id: TabId,
        reason: HibernationReason,
    ) -> HibernationResult<HibernateOutcome> {
        let span = transform_span("hibernate", id);
        let outcome = self.hibernate_inner(id, reason).instrument(span.clone()).await;
        span.record(
            "outcome",
            match &outcome {
                Ok(HibernateOutcome::Hibernated(_)) => "hibernated",
                Ok(HibernateOutcome::Declined(_)) => "declined",
                Err(_) => "failed",
            },
        );
        outcome
    }

    async fn hibernate_inner(
        &self,
        id: TabId,
        reason: HibernationReason,
    ) -> HibernationResult<HibernateOutcome> {
        let started = Instant::now();
        let (slot, mut guard) = match self.acquire(id).await {
            Ok(acquired) => acquired,
            Err(HibernationError::TabNotFound(_)) => {
                return Ok(HibernateOutcome::Declined(IneligibleReason::NotRegistered))
            }
            Err(e) => return Err(e),
        };

        let config = self.config.load_full();
        let tab = slot.snapshot();
        if let Err(declined) = policy::check_eligibility(&tab, &self.policy_context(), &config) {
            debug!(tab_id = id, reason = %declined, "Hibernation declined");
            return Ok(HibernateOutcome::Declined(declined));
        }

        let prepared = self.prepare_snapshot(&tab, reason, &config, &mut guard).await;
        let snapshot = match prepared {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.stats.inc_failed_hibernations();
                error!(tab_id = id, error = %e, "Hibernation failed, tab left resident");
                return Err(e);
            }
        };

        let memory_freed = snapshot.memory_bytes();
        let level = snapshot.level;
        let timestamp = snapshot.hibernated_at;

        *guard = None;
        self.registry.record_profile(id, snapshot.profile.clone());
        self.registry.store_snapshot(snapshot);
        slot.update(|tab| {
            tab.state = TabState::Hibernated;
            tab.metadata.clear();
        });

        self.stats.add_memory_saved(memory_freed);
        self.stats.inc_hibernations();

        let duration = started.elapsed();
        info!(
            tab_id = id,
            reason = %reason,
            level = ?level,
            memory_freed,
            duration_ms = duration.as_millis() as u64,
            "Tab hibernated"
        );

        self.events.emit(TabEvent::TabHibernated {
            id,
            memory_freed,
            timestamp,
            reason,
            duration,
        });

        Ok(HibernateOutcome::Hibernated(HibernationReport {
            tab_id: id,
            reason,
            level,
            memory_freed,
            duration,
        }))
    }

    /// Profile, capture and dispose; the tab is untouched on error
    async fn prepare_snapshot(
        &self,
        tab: &Tab,
        reason: HibernationReason,
        config: &HibernationConfig,
        guard: &mut TransitionGuard,
    ) -> HibernationResult<HibernatedSnapshot> {
        let id = tab.id;
        let content = (**guard).as_mut().ok_or_else(|| HibernationError::InvalidState {
            id,
            state: tab.state().to_string(),
            detail: "resident tab has no content".to_string(),
        })?;

        let at = now();
        let profile = MemoryProfile::of_content(&**content, self.estimator.as_ref(), at);
        let level = PreservationLevel::choose(tab, at, config.extended_preservation_window);

        let extended_state = if level >= PreservationLevel::Extended {
            let state = bounded(
                id,
                "capture_state",
                config.transform_timeout,
                content.capture_state(level),
            )
            .await?;
            Some(state)
        } else {
            None
        };

        let snapshot = HibernatedSnapshot::capture(tab, reason, profile, level, extended_state, at);

        bounded(id, "dispose", config.transform_timeout, content.dispose()).await?;

        Ok(snapshot)
    }

    /// Restore a hibernated tab to residency
    pub async fn reactivate(&self, id: TabId) -> HibernationResult<ReactivationReport> {
        let span = transform_span("reactivate", id);
        let result = async {
            let (slot, mut guard) = self.acquire(id).await?;
            self.reactivate_locked(id, &slot, &mut guard).await
        }
        .instrument(span.clone())
        .await;
        span.record("outcome", if result.is_ok() { "reactivated" } else { "failed" });
        result
    }

    async fn reactivate_locked(
        &self,
        id: TabId,
        slot: &Arc<TabSlot>,
        guard: &mut TransitionGuard,
    ) -> HibernationResult<ReactivationReport> {
        if slot.state() != TabState::Hibernated {
            return Err(HibernationError::NotHibernated(id));
        }
        let snapshot = self
            .registry
            .take_snapshot(id)
            .ok_or(HibernationError::SnapshotMissing(id))?;

        let started = Instant::now();
        let memory_restored = snapshot.memory_bytes();

        slot.update(|tab| snapshot.restore_onto(tab));
        self.stats.sub_memory_saved(memory_restored);

        let tab = slot.snapshot();
        let timeout = self.config.load().transform_timeout;
        let restored = async {
            let mut content = bounded(id, "create", timeout, self.factory.create(&tab)).await?;
            if let Some(state) = snapshot.restorable_state() {
                if let Err(e) = content.restore_state(state) {
                    // Half-restored content is released, not kept
                    if let Err(dispose_err) =
                        bounded(id, "dispose", timeout, content.dispose()).await
                    {
                        warn!(tab_id = id, error = %dispose_err, "Disposal after failed restore also failed");
                    }
                    return Err(HibernationError::transform(id, "restore_state", e));
                }
            }
            Ok::<_, HibernationError>(content)
        }
        .await;

        let content = match restored {
            Ok(content) => content,
            Err(e) => {
                slot.update(|tab| tab.state = TabState::Error);
                self.stats.inc_failed_reactivations();
                error!(tab_id = id, error = %e, "Reactivation failed, tab moved to error state");
                return Err(e);
            }
        };

        **guard = Some(content);
        slot.update(|tab| tab.state = TabState::Normal);
        self.stats.inc_reactivations();

        let duration = started.elapsed();
        let time_hibernated = snapshot.time_hibernated(now());
        info!(
            tab_id = id,
            memory_restored,
            duration_ms = duration.as_millis() as u64,
            hibernated_secs = time_hibernated.as_secs(),
            "Tab reactivated"
        );

        self.events.emit(TabEvent::TabReactivated {
            id,
            duration,
            memory_restored,
            time_hibernated,
        });

        Ok(ReactivationReport {
            tab_id: id,
            memory_restored,
            duration,
            time_hibernated,
        })
    }

    /// Make a tab the active one, reactivating it first if needed
    ///
    /// Returns only once the tab is resident (or in the error state).
    pub async fn activate(&self, id: TabId) -> HibernationResult<ActivationReport> {
        let (slot, mut guard) = self.acquire(id).await?;

        let reactivated = if slot.state() == TabState::Hibernated {
            Some(self.reactivate_locked(id, &slot, &mut guard).await?)
        } else {
            None
        };

        slot.update(|tab| tab.last_activated = now());
        let previous = self.registry.active_tab();
        self.registry.set_active(Some(id));

        debug!(tab_id = id, previous = ?previous, "Tab activated");
        Ok(ActivationReport {
            tab_id: id,
            previous,
            reactivated,
        })
    }

    pub async fn mark_loading(&self, id: TabId) -> HibernationResult<()> {
        self.shift_resident(id, TabState::Normal, TabState::Loading).await
    }

    pub async fn mark_loaded(&self, id: TabId) -> HibernationResult<()> {
        self.shift_resident(id, TabState::Loading, TabState::Normal).await
    }

    async fn shift_resident(&self, id: TabId, from: TabState, to: TabState) -> HibernationResult<()> {
        let (slot, _guard) = self.acquire(id).await?;
        let state = slot.state();
        if state != from {
            return Err(HibernationError::InvalidState {
                id,
                state: state.to_string(),
                detail: format!("expected {} to move to {}", from, to),
            });
        }
        slot.update(|tab| tab.state = to);
        Ok(())
    }

    /// Bring an errored tab back with freshly created content
    pub async fn reset_error(&self, id: TabId) -> HibernationResult<()> {
        let (slot, mut guard) = self.acquire(id).await?;
        let state = slot.state();
        if state != TabState::Error {
            return Err(HibernationError::InvalidState {
                id,
                state: state.to_string(),
                detail: "only errored tabs can be reset".to_string(),
            });
        }

        let tab = slot.snapshot();
        let timeout = self.config.load().transform_timeout;
        let content = bounded(id, "create", timeout, self.factory.create(&tab)).await?;

        *guard = Some(content);
        slot.update(|tab| tab.state = TabState::Normal);
        info!(tab_id = id, "Errored tab reset");
        Ok(())
    }

    /// Drop profiles past the retention window
    pub fn prune_profiles(&self) -> usize {
        let retention = self.config.load().profile_retention;
        let pruned = self.registry.prune_profiles(retention);
        if pruned > 0 {
            self.stats.add_profiles_pruned(pruned as u64);
            debug!(pruned, "Pruned stale memory profiles");
        }
        pruned
    }

    /// Best-effort release of every resident tab's content
    ///
    /// Released tabs move to `Error`, since they no longer hold content and
    /// need `reset_error` before they can be used again.
    pub async fn dispose_all(&self) -> usize {
        let timeout = self.config.load().transform_timeout;
        let mut disposed = 0;

        for id in self.registry.ids() {
            let Ok((slot, mut guard)) = self.acquire(id).await else {
                continue;
            };
            if let Some(mut content) = guard.take() {
                match bounded(id, "dispose", timeout, content.dispose()).await {
                    Ok(()) => disposed += 1,
                    Err(e) => warn!(tab_id = id, error = %e, "Content disposal failed at shutdown"),
                }
                slot.update(|tab| tab.state = TabState::Error);
            }
        }

        info!(disposed, "Released resident tab content");
        disposed
    }

    /// Lock a tab's transition guard, confirming the slot is still registered
    async fn acquire(&self, id: TabId) -> HibernationResult<(Arc<TabSlot>, TransitionGuard)> {
        let slot = self
            .registry
            .slot(id)
            .ok_or(HibernationError::TabNotFound(id))?;
        let guard = slot.lock().await;

        if !self.registry.is_current(id, &slot) {
            return Err(HibernationError::TabNotFound(id));
        }
        Ok((slot, guard))
    }
}

/// Run a content operation under the configured timeout
async fn bounded<T, F>(
    id: TabId,
    operation: &'static str,
    timeout: Option<Duration>,
    fut: F,
) -> HibernationResult<T>
where
    F: Future<Output = Result<T, ContentError>>,
{
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            HibernationError::Timeout {
                id,
                operation: operation.to_string(),
                timeout_ms: limit.as_millis() as u64,
            }
        })?,
        None => fut.await,
    };
    result.map_err(|e| HibernationError::transform(id, operation, e))
}
