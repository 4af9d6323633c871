/*!
 * Visibility Manager
 *
 * Bounded most-recently-activated window of tabs. Window members are
 * protected from regular optimize sweeps; members pushed out of the window
 * become hibernation candidates.
 */

use crate::core::types::TabId;
use crate::tab::TabRegistry;
use parking_lot::RwLock;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Effect of activating a tab on the window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowUpdate {
    pub was_in_window: bool,
    /// Tabs slid out of the window, oldest first
    pub evicted: Vec<TabId>,
}

struct WindowState {
    /// Most recent first
    order: VecDeque<TabId>,
    capacity: usize,
}

pub struct VisibilityManager {
    registry: Arc<TabRegistry>,
    window: RwLock<WindowState>,
}

impl VisibilityManager {
    pub fn new(registry: Arc<TabRegistry>, capacity: usize) -> Self {
        Self {
            registry,
            window: RwLock::new(WindowState {
                order: VecDeque::with_capacity(capacity + 1),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Move `id` to the front, sliding the window if it overflows
    pub fn touch(&self, id: TabId) -> WindowUpdate {
        let mut window = self.window.write();

        let position = window.order.iter().position(|&member| member == id);
        let was_in_window = position.is_some();
        if let Some(index) = position {
            window.order.remove(index);
        }
        window.order.push_front(id);

        let evicted = self.shrink(&mut window, Some(id));
        if !evicted.is_empty() {
            log::debug!("Window slid for tab {}: evicted {:?}", id, evicted);
        }

        WindowUpdate {
            was_in_window,
            evicted,
        }
    }

    /// Evict until the window fits, oldest non-pinned member first
    fn shrink(&self, window: &mut WindowState, keep: Option<TabId>) -> Vec<TabId> {
        let mut evicted = Vec::new();

        while window.order.len() > window.capacity {
            let victim = window
                .order
                .iter()
                .rposition(|&member| {
                    Some(member) != keep
                        && !self.registry.tab(member).map(|t| t.pinned).unwrap_or(false)
                })
                .or_else(|| window.order.iter().rposition(|&member| Some(member) != keep));

            match victim.and_then(|index| window.order.remove(index)) {
                Some(member) => evicted.push(member),
                None => break,
            }
        }

        evicted
    }

    pub fn remove(&self, id: TabId) -> bool {
        let mut window = self.window.write();
        match window.order.iter().position(|&member| member == id) {
            Some(index) => {
                window.order.remove(index);
                true
            }
            None => false,
        }
    }

    /// Change the capacity; returns members evicted by a shrink
    pub fn set_capacity(&self, capacity: usize) -> Vec<TabId> {
        let mut window = self.window.write();
        window.capacity = capacity.max(1);
        let keep = window.order.front().copied();
        self.shrink(&mut window, keep)
    }

    pub fn contains(&self, id: TabId) -> bool {
        self.window.read().order.contains(&id)
    }

    /// Members, most recent first
    pub fn members(&self) -> Vec<TabId> {
        self.window.read().order.iter().copied().collect()
    }

    pub fn member_set(&self) -> HashSet<TabId> {
        self.window.read().order.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.window.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.read().order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.window.read().capacity
    }
}
