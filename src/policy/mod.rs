/*!
 * Eligibility & Priority Policy
 *
 * Pure decision functions: whether a tab may hibernate, how urgently, and
 * what action the scheduler should take. No side effects; identical inputs
 * always give identical answers.
 */

use crate::core::config::{HibernationConfig, PriorityWeights};
use crate::core::limits::{LONG_IDLE, RECENT_ACTIVATION, VERY_LONG_IDLE, VERY_RECENT_ACTIVATION};
use crate::core::types::{Score, TabId, Timestamp};
use crate::tab::{Tab, TabState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inputs that are not part of the tab itself
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext {
    pub now: Timestamp,
    pub active_tab: Option<TabId>,
    pub under_pressure: bool,
}

impl PolicyContext {
    pub fn new(now: Timestamp, active_tab: Option<TabId>, under_pressure: bool) -> Self {
        Self {
            now,
            active_tab,
            under_pressure,
        }
    }
}

/// Why a hibernation request was declined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibleReason {
    NotRegistered,
    ActiveTab,
    Pinned,
    UnsavedChanges,
    AlreadyHibernated,
    Loading,
    Errored,
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotRegistered => "tab is not registered",
            Self::ActiveTab => "tab is active",
            Self::Pinned => "tab is pinned",
            Self::UnsavedChanges => "tab has unsaved changes",
            Self::AlreadyHibernated => "tab is already hibernated",
            Self::Loading => "tab is loading",
            Self::Errored => "tab is in the error state",
        };
        f.write_str(text)
    }
}

/// Advisory classification consumed by sweeps and the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Immediate,
    Scheduled,
    Monitor,
    None,
}

impl RecommendedAction {
    /// Whether a regular sweep should act on this tab now
    #[inline]
    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::Immediate | Self::Scheduled)
    }
}

/// Check whether `tab` may be hibernated
pub fn check_eligibility(
    tab: &Tab,
    ctx: &PolicyContext,
    config: &HibernationConfig,
) -> Result<(), IneligibleReason> {
    match tab.state() {
        TabState::Hibernated => return Err(IneligibleReason::AlreadyHibernated),
        TabState::Loading => return Err(IneligibleReason::Loading),
        TabState::Error => return Err(IneligibleReason::Errored),
        TabState::Normal => {}
    }

    if ctx.active_tab == Some(tab.id) {
        return Err(IneligibleReason::ActiveTab);
    }
    if tab.pinned && !config.allow_pinned_hibernation {
        return Err(IneligibleReason::Pinned);
    }
    if tab.unsaved_changes && !config.allow_unsaved_hibernation {
        return Err(IneligibleReason::UnsavedChanges);
    }

    Ok(())
}

#[inline]
pub fn can_hibernate(tab: &Tab, ctx: &PolicyContext, config: &HibernationConfig) -> bool {
    check_eligibility(tab, ctx, config).is_ok()
}

/// Weighted score; lower hibernates sooner
///
/// Non-increasing in idle time for any non-negative weights. Saturates at
/// the `Score` bounds instead of wrapping.
pub fn priority(tab: &Tab, now: Timestamp, weights: &PriorityWeights) -> Score {
    let mut score = weights.baseline;

    if tab.pinned {
        score = score.saturating_add(weights.pinned_penalty);
    }
    if tab.unsaved_changes {
        score = score.saturating_add(weights.unsaved_penalty);
    }

    let idle = tab.idle_time(now);
    if idle < VERY_RECENT_ACTIVATION {
        score = score.saturating_add(weights.very_recent_penalty);
    } else if idle < RECENT_ACTIVATION {
        score = score.saturating_add(weights.recent_penalty);
    }

    if idle > LONG_IDLE {
        score = score.saturating_sub(weights.long_idle_bonus);
    }
    if idle > VERY_LONG_IDLE {
        score = score.saturating_sub(weights.very_long_idle_bonus);
    }

    score
}

/// Classify what should happen to a tab
pub fn recommend(tab: &Tab, ctx: &PolicyContext, config: &HibernationConfig) -> RecommendedAction {
    if !can_hibernate(tab, ctx, config) {
        return RecommendedAction::None;
    }

    let weights = &config.weights;
    let score = priority(tab, ctx.now, weights);
    let urgent = weights.baseline.saturating_sub(weights.very_long_idle_bonus);

    if score <= urgent || (ctx.under_pressure && score <= weights.baseline) {
        RecommendedAction::Immediate
    } else if score <= weights.baseline || ctx.under_pressure {
        RecommendedAction::Scheduled
    } else {
        RecommendedAction::Monitor
    }
}
