/*!
 * Hibernation Statistics
 *
 * Lock-free counters updated on the hot path, plus the serializable snapshot
 * published in `StatsUpdated` events.
 */

use crate::core::types::{Size, TabId, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters shared by the engine and the orchestrator
#[derive(Debug, Default)]
pub struct AtomicHibernationStats {
    hibernations: AtomicU64,
    reactivations: AtomicU64,
    failed_hibernations: AtomicU64,
    failed_reactivations: AtomicU64,
    memory_saved: AtomicU64,
    sweeps: AtomicU64,
    pressure_sweeps: AtomicU64,
    optimize_passes: AtomicU64,
    profiles_pruned: AtomicU64,
}

impl AtomicHibernationStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn inc_hibernations(&self) {
        self.hibernations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_reactivations(&self) {
        self.reactivations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_failed_hibernations(&self) {
        self.failed_hibernations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_failed_reactivations(&self) {
        self.failed_reactivations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_sweeps(&self, pressure: bool) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        if pressure {
            self.pressure_sweeps.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn inc_optimize_passes(&self) {
        self.optimize_passes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_profiles_pruned(&self, count: u64) {
        self.profiles_pruned.fetch_add(count, Ordering::Relaxed);
    }

    /// Credit memory released by a hibernation
    #[inline]
    pub fn add_memory_saved(&self, bytes: Size) {
        self.memory_saved.fetch_add(bytes, Ordering::AcqRel);
    }

    /// Debit memory spent by a reactivation or unregistration (saturating)
    #[inline]
    pub fn sub_memory_saved(&self, bytes: Size) {
        let _ = self
            .memory_saved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(bytes))
            });
    }

    #[inline]
    pub fn memory_saved(&self) -> Size {
        self.memory_saved.load(Ordering::Acquire)
    }

    pub fn hibernations(&self) -> u64 {
        self.hibernations.load(Ordering::Relaxed)
    }

    pub fn reactivations(&self) -> u64 {
        self.reactivations.load(Ordering::Relaxed)
    }

    /// Copy counters into a snapshot; registry-derived fields stay zeroed
    pub fn snapshot(&self, captured_at: Timestamp) -> HibernationStats {
        HibernationStats {
            hibernations: self.hibernations.load(Ordering::Relaxed),
            reactivations: self.reactivations.load(Ordering::Relaxed),
            failed_hibernations: self.failed_hibernations.load(Ordering::Relaxed),
            failed_reactivations: self.failed_reactivations.load(Ordering::Relaxed),
            memory_saved: self.memory_saved(),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            pressure_sweeps: self.pressure_sweeps.load(Ordering::Relaxed),
            optimize_passes: self.optimize_passes.load(Ordering::Relaxed),
            profiles_pruned: self.profiles_pruned.load(Ordering::Relaxed),
            captured_at,
            ..HibernationStats::empty(captured_at)
        }
    }
}

/// Aggregate statistics snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HibernationStats {
    pub total_tabs: usize,
    pub resident_tabs: usize,
    pub hibernated_tabs: usize,
    pub errored_tabs: usize,
    pub active_tab: Option<TabId>,

    pub hibernations: u64,
    pub reactivations: u64,
    pub failed_hibernations: u64,
    pub failed_reactivations: u64,

    pub memory_saved: Size,
    /// Memory saved per currently hibernated tab
    pub average_memory_saved: Size,

    pub sweeps: u64,
    pub pressure_sweeps: u64,
    pub optimize_passes: u64,
    pub profiles_pruned: u64,

    pub window_len: usize,
    pub window_capacity: usize,
    pub queue_len: usize,
    pub tracked_profiles: usize,
    pub under_pressure: bool,

    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: Timestamp,
}

impl HibernationStats {
    fn empty(captured_at: Timestamp) -> Self {
        Self {
            total_tabs: 0,
            resident_tabs: 0,
            hibernated_tabs: 0,
            errored_tabs: 0,
            active_tab: None,
            hibernations: 0,
            reactivations: 0,
            failed_hibernations: 0,
            failed_reactivations: 0,
            memory_saved: 0,
            average_memory_saved: 0,
            sweeps: 0,
            pressure_sweeps: 0,
            optimize_passes: 0,
            profiles_pruned: 0,
            window_len: 0,
            window_capacity: 0,
            queue_len: 0,
            tracked_profiles: 0,
            under_pressure: false,
            captured_at,
        }
    }

    /// Recompute derived fields after the counts are filled in
    pub(crate) fn finalize(mut self) -> Self {
        self.average_memory_saved = if self.hibernated_tabs == 0 {
            0
        } else {
            self.memory_saved / self.hibernated_tabs as u64
        };
        self
    }

    /// Whether the tab population exceeds `multiple` windows
    pub fn exceeds_window(&self, multiple: usize) -> bool {
        self.total_tabs > self.window_capacity.saturating_mul(multiple)
    }

    /// Compact JSON line for logs and external consumers
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
