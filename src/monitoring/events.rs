/*!
 * Engine Events
 * Notifications published to the surrounding application
 */

use super::stats::HibernationStats;
use crate::core::types::{Size, TabId, Timestamp};
use crate::tab::HibernationReason;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Events emitted after the corresponding registry mutation is visible
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TabEvent {
    TabHibernated {
        id: TabId,
        memory_freed: Size,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: Timestamp,
        reason: HibernationReason,
        #[serde_as(as = "DurationMilliSeconds<u64>")]
        duration: Duration,
    },
    TabReactivated {
        id: TabId,
        #[serde_as(as = "DurationMilliSeconds<u64>")]
        duration: Duration,
        memory_restored: Size,
        #[serde_as(as = "DurationMilliSeconds<u64>")]
        time_hibernated: Duration,
    },
    StatsUpdated(HibernationStats),
    PressureChanged {
        active: bool,
    },
}

impl TabEvent {
    /// Tab the event concerns, if any
    pub fn tab_id(&self) -> Option<TabId> {
        match self {
            Self::TabHibernated { id, .. } | Self::TabReactivated { id, .. } => Some(*id),
            Self::StatsUpdated(_) | Self::PressureChanged { .. } => None,
        }
    }
}

/// Fan-out of engine events over a tokio broadcast channel
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: Arc<broadcast::Sender<TabEvent>>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TabEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: TabEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(crate::core::limits::EVENT_CHANNEL_CAPACITY)
    }
}
