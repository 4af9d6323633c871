/*!
 * Tab Types
 * Session descriptors and the enums shared by every subsystem
 */

use crate::core::types::{elapsed_between, now, TabId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Auxiliary attributes attached to a tab
pub type TabMetadata = BTreeMap<String, serde_json::Value>;

/// Tab residency state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabState {
    /// Content resident and ready
    Normal,
    /// Content resident, still loading
    Loading,
    /// Content discarded, snapshot retained
    Hibernated,
    /// Reactivation failed; terminal until reset
    Error,
}

impl TabState {
    /// States that own a content handle
    #[inline]
    pub const fn is_resident(&self) -> bool {
        matches!(self, Self::Normal | Self::Loading)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Loading => "loading",
            Self::Hibernated => "hibernated",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TabState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a tab was hibernated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HibernationReason {
    Automatic,
    Manual,
    MemoryPressure,
}

impl fmt::Display for HibernationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Automatic => write!(f, "automatic"),
            Self::Manual => write!(f, "manual"),
            Self::MemoryPressure => write!(f, "memory_pressure"),
        }
    }
}

/// How much auxiliary state a snapshot captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreservationLevel {
    /// Descriptor fields only
    Basic,
    /// Plus view state (scroll, selection, view mode)
    Extended,
    /// Plus unsaved drafts
    Full,
}

impl PreservationLevel {
    /// Pick the level for a tab about to hibernate
    ///
    /// `Full` for unsaved changes, `Extended` for pinned or recently activated
    /// tabs, otherwise `Basic`.
    pub fn choose(tab: &Tab, at: Timestamp, extended_window: Duration) -> Self {
        if tab.unsaved_changes {
            Self::Full
        } else if tab.pinned || tab.idle_time(at) < extended_window {
            Self::Extended
        } else {
            Self::Basic
        }
    }
}

/// Tab session descriptor
///
/// The descriptor is what stays resident while a tab is hibernated. Its state
/// is only changed by the hibernation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub title: String,
    pub path: PathBuf,
    pub color: Option<String>,
    pub pinned: bool,
    pub unsaved_changes: bool,
    pub(crate) state: TabState,
    #[serde(with = "time::serde::rfc3339")]
    pub last_activated: Timestamp,
    pub metadata: TabMetadata,
}

impl Tab {
    /// Create a freshly opened tab
    pub fn new(id: TabId, title: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            title: title.into(),
            path: path.into(),
            color: None,
            pinned: false,
            unsaved_changes: false,
            state: TabState::Normal,
            last_activated: now(),
            metadata: TabMetadata::new(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn with_unsaved_changes(mut self, unsaved: bool) -> Self {
        self.unsaved_changes = unsaved;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Register the tab as still loading its content
    pub fn loading(mut self) -> Self {
        self.state = TabState::Loading;
        self
    }

    /// Backdate the last activation
    pub fn idle_for(mut self, idle: Duration) -> Self {
        self.last_activated = now() - idle;
        self
    }

    pub fn activated_at(mut self, at: Timestamp) -> Self {
        self.last_activated = at;
        self
    }

    #[inline]
    pub fn state(&self) -> TabState {
        self.state
    }

    #[inline]
    pub fn is_hibernated(&self) -> bool {
        self.state == TabState::Hibernated
    }

    /// Time since the last activation
    pub fn idle_time(&self, at: Timestamp) -> Duration {
        elapsed_between(self.last_activated, at)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
