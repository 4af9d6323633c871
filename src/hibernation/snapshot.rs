/*!
 * Hibernated Snapshot
 * Independent copy of everything needed to bring a tab back
 */

use super::profile::MemoryProfile;
use crate::core::types::{elapsed_between, TabId, Timestamp};
use crate::tab::{ExtendedState, HibernationReason, PreservationLevel, Tab, TabMetadata};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HibernatedSnapshot {
    pub tab_id: TabId,
    pub title: String,
    pub path: PathBuf,
    pub color: Option<String>,
    pub pinned: bool,
    pub metadata: TabMetadata,
    #[serde(with = "time::serde::rfc3339")]
    pub hibernated_at: Timestamp,
    pub reason: HibernationReason,
    pub profile: MemoryProfile,
    pub level: PreservationLevel,
    /// Present only when `level >= Extended`
    pub extended_state: Option<ExtendedState>,
}

impl HibernatedSnapshot {
    /// Deep-copy the descriptor fields of `tab`
    pub fn capture(
        tab: &Tab,
        reason: HibernationReason,
        profile: MemoryProfile,
        level: PreservationLevel,
        extended_state: Option<ExtendedState>,
        at: Timestamp,
    ) -> Self {
        let extended_state = if level >= PreservationLevel::Extended {
            extended_state
        } else {
            None
        };

        Self {
            tab_id: tab.id,
            title: tab.title.clone(),
            path: tab.path.clone(),
            color: tab.color.clone(),
            pinned: tab.pinned,
            metadata: tab.metadata.clone(),
            hibernated_at: at,
            reason,
            profile,
            level,
            extended_state,
        }
    }

    /// Write the captured fields back onto `tab`
    pub fn restore_onto(&self, tab: &mut Tab) {
        tab.title = self.title.clone();
        tab.path = self.path.clone();
        tab.color = self.color.clone();
        tab.pinned = self.pinned;
        tab.metadata = self.metadata.clone();
    }

    /// Extended state to re-apply, if the level calls for it
    pub fn restorable_state(&self) -> Option<&ExtendedState> {
        if self.level >= PreservationLevel::Extended {
            self.extended_state.as_ref()
        } else {
            None
        }
    }

    pub fn time_hibernated(&self, at: Timestamp) -> Duration {
        elapsed_between(self.hibernated_at, at)
    }

    #[inline]
    pub fn memory_bytes(&self) -> u64 {
        self.profile.estimated_bytes
    }
}
