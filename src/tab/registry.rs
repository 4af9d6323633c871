/*!
 * Tab Registry
 *
 * Authoritative store of tab descriptors, hibernation snapshots and memory
 * profiles. Lock-free sharded maps (DashMap) keyed by tab id; each tab slot
 * carries its own descriptor lock and transition guard.
 */

use super::content::TabContent;
use super::types::{Tab, TabState};
use crate::core::shards::{shard_amount, WorkloadProfile};
use crate::core::types::{now, TabId, Timestamp};
use crate::hibernation::{HibernatedSnapshot, MemoryProfile};
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Content handle; the mutex doubles as the per-tab transition guard
pub(crate) type ContentCell = Option<Box<dyn TabContent>>;
pub(crate) type TransitionGuard = OwnedMutexGuard<ContentCell>;

/// One registered tab: descriptor plus guarded content
pub(crate) struct TabSlot {
    record: RwLock<Tab>,
    content: Arc<Mutex<ContentCell>>,
}

impl TabSlot {
    fn new(tab: Tab, content: Box<dyn TabContent>) -> Self {
        Self {
            record: RwLock::new(tab),
            content: Arc::new(Mutex::new(Some(content))),
        }
    }

    /// Clone of the current descriptor
    pub(crate) fn snapshot(&self) -> Tab {
        self.record.read().clone()
    }

    pub(crate) fn state(&self) -> TabState {
        self.record.read().state
    }

    /// Mutate the descriptor in place
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut Tab) -> R) -> R {
        f(&mut self.record.write())
    }

    /// Wait for exclusive transition rights over this tab
    pub(crate) async fn lock(&self) -> TransitionGuard {
        self.content.clone().lock_owned().await
    }
}

/// Thread-safe tab bookkeeping
pub struct TabRegistry {
    tabs: DashMap<TabId, Arc<TabSlot>, RandomState>,
    snapshots: DashMap<TabId, HibernatedSnapshot, RandomState>,
    profiles: DashMap<TabId, MemoryProfile, RandomState>,
    active: RwLock<Option<TabId>>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self {
            tabs: DashMap::with_hasher_and_shard_amount(
                RandomState::new(),
                shard_amount(WorkloadProfile::HighContention),
            ),
            snapshots: DashMap::with_hasher_and_shard_amount(
                RandomState::new(),
                shard_amount(WorkloadProfile::MediumContention),
            ),
            profiles: DashMap::with_hasher_and_shard_amount(
                RandomState::new(),
                shard_amount(WorkloadProfile::LowContention),
            ),
            active: RwLock::new(None),
        }
    }

    /// Insert a new slot; returns false if the id is taken
    pub(crate) fn insert(&self, tab: Tab, content: Box<dyn TabContent>) -> bool {
        use dashmap::mapref::entry::Entry;

        match self.tabs.entry(tab.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(TabSlot::new(tab, content)));
                true
            }
        }
    }

    pub(crate) fn remove(&self, id: TabId) -> Option<Arc<TabSlot>> {
        self.tabs.remove(&id).map(|(_, slot)| slot)
    }

    pub(crate) fn slot(&self, id: TabId) -> Option<Arc<TabSlot>> {
        self.tabs.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether `slot` is still the registered slot for `id`
    pub(crate) fn is_current(&self, id: TabId, slot: &Arc<TabSlot>) -> bool {
        self.tabs
            .get(&id)
            .map(|entry| Arc::ptr_eq(entry.value(), slot))
            .unwrap_or(false)
    }

    /// Copy of a tab descriptor
    pub fn tab(&self, id: TabId) -> Option<Tab> {
        self.tabs.get(&id).map(|entry| entry.snapshot())
    }

    /// Copies of every registered descriptor, ordered by id
    pub fn tabs(&self) -> Vec<Tab> {
        let mut tabs: Vec<Tab> = self.tabs.iter().map(|entry| entry.snapshot()).collect();
        tabs.sort_by_key(|tab| tab.id);
        tabs
    }

    pub fn ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(|entry| *entry.key()).collect()
    }

    pub fn state(&self, id: TabId) -> Option<TabState> {
        self.tabs.get(&id).map(|entry| entry.state())
    }

    pub fn contains(&self, id: TabId) -> bool {
        self.tabs.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Number of tabs in each state: (resident, hibernated, errored)
    pub fn state_counts(&self) -> (usize, usize, usize) {
        self.tabs
            .iter()
            .fold((0, 0, 0), |(resident, hibernated, errored), entry| {
                match entry.state() {
                    TabState::Normal | TabState::Loading => (resident + 1, hibernated, errored),
                    TabState::Hibernated => (resident, hibernated + 1, errored),
                    TabState::Error => (resident, hibernated, errored + 1),
                }
            })
    }

    pub fn hibernated_count(&self) -> usize {
        self.state_counts().1
    }

    pub fn active_tab(&self) -> Option<TabId> {
        *self.active.read()
    }

    pub(crate) fn set_active(&self, id: Option<TabId>) {
        *self.active.write() = id;
    }

    /// Clear the active tab if it is `id`
    pub(crate) fn clear_active_if(&self, id: TabId) {
        let mut active = self.active.write();
        if *active == Some(id) {
            *active = None;
        }
    }

    pub(crate) fn store_snapshot(&self, snapshot: HibernatedSnapshot) {
        self.snapshots.insert(snapshot.tab_id, snapshot);
    }

    /// Take ownership of a snapshot, removing it from storage
    pub(crate) fn take_snapshot(&self, id: TabId) -> Option<HibernatedSnapshot> {
        self.snapshots.remove(&id).map(|(_, snapshot)| snapshot)
    }

    pub fn snapshot(&self, id: TabId) -> Option<HibernatedSnapshot> {
        self.snapshots.get(&id).map(|entry| entry.value().clone())
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub(crate) fn record_profile(&self, id: TabId, profile: MemoryProfile) {
        self.profiles.insert(id, profile);
    }

    pub(crate) fn remove_profile(&self, id: TabId) {
        self.profiles.remove(&id);
    }

    pub fn profile(&self, id: TabId) -> Option<MemoryProfile> {
        self.profiles.get(&id).map(|entry| entry.value().clone())
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    /// Drop profiles older than `retention`; returns how many were dropped
    pub(crate) fn prune_profiles(&self, retention: Duration) -> usize {
        self.prune_profiles_at(now(), retention)
    }

    pub(crate) fn prune_profiles_at(&self, at: Timestamp, retention: Duration) -> usize {
        let before = self.profiles.len();
        self.profiles
            .retain(|_, profile| profile.age(at) <= retention);
        before.saturating_sub(self.profiles.len())
    }
}

impl Default for TabRegistry {
    fn default() -> Self {
        Self::new()
    }
}
