/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::TabId;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for engine operations
pub type HibernationResult<T> = Result<T, HibernationError>;

/// Engine errors
///
/// Policy refusals are not errors: they surface as `HibernateOutcome::Declined`.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum HibernationError {
    #[error("Tab {0} not found")]
    #[diagnostic(
        code(hibernation::tab_not_found),
        help("The tab may have been closed or was never registered.")
    )]
    TabNotFound(TabId),

    #[error("Tab {0} is already registered")]
    #[diagnostic(
        code(hibernation::already_registered),
        help("Unregister the existing tab before registering it again.")
    )]
    AlreadyRegistered(TabId),

    #[error("Tab {id} is in state {state}: {detail}")]
    #[diagnostic(
        code(hibernation::invalid_state),
        help("Operation cannot be performed in the tab's current state.")
    )]
    InvalidState {
        id: TabId,
        state: String,
        detail: String,
    },

    #[error("Tab {0} is not hibernated")]
    #[diagnostic(
        code(hibernation::not_hibernated),
        help("Only hibernated tabs can be reactivated.")
    )]
    NotHibernated(TabId),

    #[error("No hibernation snapshot stored for tab {0}")]
    #[diagnostic(
        code(hibernation::snapshot_missing),
        help("The snapshot was already consumed or discarded.")
    )]
    SnapshotMissing(TabId),

    #[error("{operation} failed for tab {id}: {reason}")]
    #[diagnostic(
        code(hibernation::transform_failed),
        help("Check the content provider logs. Failed reactivations leave the tab in the Error state.")
    )]
    TransformFailed {
        id: TabId,
        operation: String,
        reason: String,
    },

    #[error("{operation} timed out for tab {id} after {timeout_ms}ms")]
    #[diagnostic(
        code(hibernation::timeout),
        help("Content disposal or re-creation stalled. Consider raising transform_timeout.")
    )]
    Timeout {
        id: TabId,
        operation: String,
        timeout_ms: u64,
    },

    #[error("Candidate queue full ({capacity} entries)")]
    #[diagnostic(
        code(hibernation::queue_full),
        help("Drain cycles are falling behind. Raise queue_capacity or per_cycle_cap.")
    )]
    QueueFull { capacity: usize },

    #[error("Resource monitor unavailable: {0}")]
    #[diagnostic(
        code(hibernation::monitor_unavailable),
        help("Pressure-triggered sweeps are disabled; time-triggered sweeps still run.")
    )]
    ResourceMonitorUnavailable(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(hibernation::invalid_config),
        help("Caps, intervals and the window maximum must be greater than zero.")
    )]
    InvalidConfig(String),

    #[error("Engine is shutting down")]
    #[diagnostic(code(hibernation::shutting_down))]
    ShuttingDown,
}

impl HibernationError {
    /// Build a transform failure for a given operation
    pub fn transform(id: TabId, operation: &str, reason: impl ToString) -> Self {
        Self::TransformFailed {
            id,
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure concerns a single tab (and must not stop a batch)
    pub fn is_per_tab(&self) -> bool {
        matches!(
            self,
            Self::TabNotFound(_)
                | Self::InvalidState { .. }
                | Self::NotHibernated(_)
                | Self::SnapshotMissing(_)
                | Self::TransformFailed { .. }
                | Self::Timeout { .. }
        )
    }
}

/// Errors raised by content providers (disposal, state capture, re-creation)
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ContentError {
    #[error("State capture failed: {0}")]
    Capture(String),

    #[error("State restore failed: {0}")]
    Restore(String),

    #[error("Disposal failed: {0}")]
    Dispose(String),

    #[error("Content creation failed: {0}")]
    Create(String),
}
