/*!
 * Candidate Queue
 *
 * Bounded FIFO of hibernation intents. Duplicate entries for a tab are
 * tolerated; every entry is re-validated when it is drained.
 */

use crate::core::errors::{HibernationError, HibernationResult};
use crate::core::types::{Score, TabId};
use crate::tab::HibernationReason;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Ephemeral queue entry
#[derive(Debug, Clone, PartialEq)]
pub struct HibernationCandidate {
    pub tab_id: TabId,
    pub enqueued_at: Instant,
    pub reason: HibernationReason,
    pub priority: Score,
}

impl HibernationCandidate {
    pub fn new(tab_id: TabId, reason: HibernationReason, priority: Score) -> Self {
        Self {
            tab_id,
            enqueued_at: Instant::now(),
            reason,
            priority,
        }
    }

    /// Time spent in the queue so far
    pub fn dwell(&self, at: Instant) -> Duration {
        at.saturating_duration_since(self.enqueued_at)
    }
}

pub struct CandidateQueue {
    entries: Mutex<VecDeque<HibernationCandidate>>,
    capacity: AtomicUsize,
}

impl CandidateQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: AtomicUsize::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Resize; entries beyond the new capacity stay until drained
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
    }

    pub fn push(&self, candidate: HibernationCandidate) -> HibernationResult<()> {
        let capacity = self.capacity();
        let mut entries = self.entries.lock();
        if entries.len() >= capacity {
            return Err(HibernationError::QueueFull { capacity });
        }
        entries.push_back(candidate);
        Ok(())
    }

    /// Pop the oldest entry once it has dwelt at least `min_dwell`
    ///
    /// Entries are in enqueue order, so a front entry that is not ready means
    /// nothing behind it is ready either.
    pub fn pop_ready(&self, min_dwell: Duration) -> Option<HibernationCandidate> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.front() {
            Some(front) if front.dwell(now) >= min_dwell => entries.pop_front(),
            _ => None,
        }
    }

    /// Drop every entry for a tab (superseded by activation or removal)
    pub fn remove_tab(&self, tab_id: TabId) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|c| c.tab_id != tab_id);
        before - entries.len()
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.entries.lock().iter().any(|c| c.tab_id == tab_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
