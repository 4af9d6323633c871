/*!
 * Hibernation Sweeps
 *
 * Capped batch hibernation used by pressure reaction and optimize passes.
 * Candidates are ordered off-window first, then by ascending priority, then
 * by id. Per-tab failures are recorded and never stop the batch.
 */

use super::engine::{HibernateOutcome, HibernationEngine};
use crate::core::config::HibernationConfig;
use crate::core::types::{Score, Size, TabId};
use crate::monitoring::sweep_span;
use crate::policy::{self, PolicyContext};
use crate::tab::{HibernationReason, Tab};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// What triggered a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    /// Regular optimize pass: recommended, off-window tabs only
    Optimize,
    /// Aggressive optimize pass: every eligible tab
    Aggressive,
    /// Memory pressure: every eligible tab, no dwell delay
    Pressure,
}

impl SweepKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Optimize => "optimize",
            Self::Aggressive => "aggressive",
            Self::Pressure => "pressure",
        }
    }

    /// Whether in-window tabs may be swept (after every off-window tab)
    const fn includes_window(&self) -> bool {
        !matches!(self, Self::Optimize)
    }
}

/// One ranked sweep candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepCandidate {
    pub tab_id: TabId,
    pub priority: Score,
    pub in_window: bool,
}

/// Summary of a finished sweep
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub id: Uuid,
    pub kind: SweepKind,
    pub examined: usize,
    pub hibernated: Vec<TabId>,
    pub failed: Vec<TabId>,
    pub memory_freed: Size,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub duration: Duration,
}

impl SweepReport {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Rank eligible tabs and keep the first `cap`
pub fn select_candidates(
    tabs: &[Tab],
    window: &HashSet<TabId>,
    ctx: &PolicyContext,
    config: &HibernationConfig,
    kind: SweepKind,
    cap: usize,
) -> Vec<SweepCandidate> {
    let mut ranked: Vec<SweepCandidate> = tabs
        .iter()
        .filter(|tab| {
            let action = policy::recommend(tab, ctx, config);
            match kind {
                SweepKind::Optimize => action.is_actionable() && !window.contains(&tab.id),
                SweepKind::Aggressive | SweepKind::Pressure => {
                    action != policy::RecommendedAction::None
                }
            }
        })
        .map(|tab| SweepCandidate {
            tab_id: tab.id,
            priority: policy::priority(tab, ctx.now, &config.weights),
            in_window: kind.includes_window() && window.contains(&tab.id),
        })
        .collect();

    ranked.sort_by_key(|c| (c.in_window, c.priority, c.tab_id));
    ranked.truncate(cap);
    ranked
}

impl HibernationEngine {
    /// Hibernate up to `cap` tabs chosen by policy
    pub async fn sweep(
        &self,
        kind: SweepKind,
        reason: HibernationReason,
        cap: usize,
        window: &HashSet<TabId>,
    ) -> SweepReport {
        let id = Uuid::new_v4();
        let span = sweep_span(kind.as_str(), id);
        let report = self
            .run_sweep(id, kind, reason, cap, window)
            .instrument(span.clone())
            .await;
        span.record("hibernated", report.hibernated.len());
        report
    }

    async fn run_sweep(
        &self,
        id: Uuid,
        kind: SweepKind,
        reason: HibernationReason,
        cap: usize,
        window: &HashSet<TabId>,
    ) -> SweepReport {
        let started = Instant::now();
        let tabs = self.registry().tabs();
        let config = self.config();
        let candidates = select_candidates(&tabs, window, &self.policy_context(), &config, kind, cap);

        let mut report = SweepReport {
            id,
            kind,
            examined: tabs.len(),
            hibernated: Vec::with_capacity(candidates.len()),
            failed: Vec::new(),
            memory_freed: 0,
            duration: Duration::ZERO,
        };

        for candidate in candidates {
            match self.hibernate(candidate.tab_id, reason).await {
                Ok(HibernateOutcome::Hibernated(done)) => {
                    report.memory_freed += done.memory_freed;
                    report.hibernated.push(candidate.tab_id);
                }
                Ok(HibernateOutcome::Declined(why)) => {
                    debug!(tab_id = candidate.tab_id, reason = %why, "Candidate no longer eligible");
                }
                Err(e) => {
                    warn!(tab_id = candidate.tab_id, error = %e, "Sweep candidate failed");
                    report.failed.push(candidate.tab_id);
                }
            }
        }

        self.stats().inc_sweeps(kind == SweepKind::Pressure);
        report.duration = started.elapsed();

        info!(
            kind = kind.as_str(),
            examined = report.examined,
            hibernated = report.hibernated.len(),
            failed = report.failed.len(),
            memory_freed = report.memory_freed,
            "Sweep complete"
        );
        report
    }
}
