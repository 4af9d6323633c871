/*!
 * Core Types
 * Common types used across the hibernation engine
 */

use std::time::Duration;
use time::OffsetDateTime;

/// Tab identifier (stable for the lifetime of the tab, supplied by the host application)
pub type TabId = u64;

/// Byte count for memory estimates
pub type Size = u64;

/// Priority score (lower hibernates sooner)
pub type Score = i64;

/// Wall-clock timestamp
pub type Timestamp = OffsetDateTime;

/// Current wall-clock time (UTC)
#[inline]
pub fn now() -> Timestamp {
    OffsetDateTime::now_utc()
}

/// Non-negative elapsed time between two wall-clock timestamps
///
/// Clock skew (a `since` in the future) yields zero rather than a negative span.
#[inline]
pub fn elapsed_between(since: Timestamp, until: Timestamp) -> Duration {
    Duration::try_from(until - since).unwrap_or_default()
}
