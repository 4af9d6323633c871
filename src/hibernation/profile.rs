/*!
 * Memory Profiling
 * Injectable size estimation keyed on content classification
 */

use crate::core::limits::LARGE_CONTENT_THRESHOLD;
use crate::core::types::{elapsed_between, Size, Timestamp};
use crate::tab::{ContentKind, TabContent};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MIB: Size = 1024 * 1024;

/// Estimates the resident size of a tab's content
pub trait SizeEstimator: Send + Sync {
    fn estimate(&self, kind: ContentKind) -> Size;
}

impl<F> SizeEstimator for F
where
    F: Fn(ContentKind) -> Size + Send + Sync,
{
    fn estimate(&self, kind: ContentKind) -> Size {
        self(kind)
    }
}

/// Fixed per-kind estimates
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSizeEstimator;

impl SizeEstimator for DefaultSizeEstimator {
    fn estimate(&self, kind: ContentKind) -> Size {
        match kind {
            ContentKind::Directory => 4 * MIB,
            ContentKind::Document => 8 * MIB,
            ContentKind::Image => 12 * MIB,
            ContentKind::Media => 48 * MIB,
            ContentKind::Archive => 24 * MIB,
            ContentKind::Web => 32 * MIB,
            ContentKind::Unknown => 2 * MIB,
        }
    }
}

/// Point-in-time memory estimate for one tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryProfile {
    pub estimated_bytes: Size,
    pub kind: ContentKind,
    pub large_content: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub profiled_at: Timestamp,
}

impl MemoryProfile {
    pub fn new(estimated_bytes: Size, kind: ContentKind, profiled_at: Timestamp) -> Self {
        Self {
            estimated_bytes,
            kind,
            large_content: estimated_bytes >= LARGE_CONTENT_THRESHOLD,
            profiled_at,
        }
    }

    /// Profile content of the given kind with an estimator
    pub fn capture(estimator: &dyn SizeEstimator, kind: ContentKind, at: Timestamp) -> Self {
        Self::new(estimator.estimate(kind), kind, at)
    }

    /// Profile live content, preferring its own size hint over the estimate
    pub fn of_content(content: &dyn TabContent, estimator: &dyn SizeEstimator, at: Timestamp) -> Self {
        let kind = content.kind();
        let bytes = content
            .size_hint()
            .unwrap_or_else(|| estimator.estimate(kind));
        Self::new(bytes, kind, at)
    }

    pub fn age(&self, at: Timestamp) -> Duration {
        elapsed_between(self.profiled_at, at)
    }
}
