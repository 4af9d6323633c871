/*!
 * Engine Limits and Constants
 *
 * Centralized location for default thresholds, intervals and priority weights.
 * Every value here is only a default: `HibernationConfig` carries the live value.
 */

use std::time::Duration;

// =============================================================================
// SCHEDULER
// =============================================================================

/// Interval between candidate queue drain cycles
pub const DEFAULT_QUEUE_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum candidates examined per drain cycle
pub const DEFAULT_PER_CYCLE_CAP: usize = 3;

/// Minimum time a candidate waits in the queue before it may be hibernated
pub const DEFAULT_MIN_DWELL: Duration = Duration::from_secs(60);

/// Candidate queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

// =============================================================================
// RETENTION
// =============================================================================

/// Interval between profile retention sweeps
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Memory profiles older than this are dropped from bookkeeping
pub const DEFAULT_PROFILE_RETENTION: Duration = Duration::from_secs(30 * 60);

// =============================================================================
// OPTIMIZATION
// =============================================================================

/// Interval between global optimize passes (also the StatsUpdated cadence)
pub const DEFAULT_OPTIMIZE_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Tabs hibernated by a non-aggressive optimize sweep
pub const DEFAULT_OPTIMIZE_BATCH: usize = 5;

/// Tabs hibernated by an aggressive optimize sweep
pub const DEFAULT_AGGRESSIVE_BATCH: usize = 20;

/// Tabs hibernated by a memory-pressure sweep
pub const DEFAULT_PRESSURE_BATCH: usize = 5;

/// Periodic sweep fires when tab count exceeds this multiple of the window capacity
pub const DEFAULT_OPTIMIZE_TAB_MULTIPLE: usize = 2;

// =============================================================================
// VISIBLE WINDOW
// =============================================================================

/// Recently-active tabs kept next to the active tab
pub const DEFAULT_WINDOW_BUFFER: usize = 8;

/// Hard cap on the visible window
pub const DEFAULT_MAX_WINDOW: usize = 12;

// =============================================================================
// PRESERVATION
// =============================================================================

/// Tabs activated within this span get `Extended` preservation
pub const EXTENDED_PRESERVATION_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Estimates at or above this size flag the profile as large content (20MB)
pub const LARGE_CONTENT_THRESHOLD: u64 = 20 * 1024 * 1024;

/// Upper bound for a single content disposal / capture / re-creation step
pub const DEFAULT_TRANSFORM_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// PRIORITY
// =============================================================================

/// Activation within this span counts as "very recent"
pub const VERY_RECENT_ACTIVATION: Duration = Duration::from_secs(5 * 60);

/// Activation within this span counts as "recent"
pub const RECENT_ACTIVATION: Duration = Duration::from_secs(30 * 60);

/// Idle beyond this span earns the long-idle bonus
pub const LONG_IDLE: Duration = Duration::from_secs(2 * 60 * 60);

/// Idle beyond this span earns the very-long-idle bonus
pub const VERY_LONG_IDLE: Duration = Duration::from_secs(24 * 60 * 60);

pub const PRIORITY_BASELINE: i64 = 100;
pub const PINNED_PENALTY: i64 = 1_000;
pub const UNSAVED_PENALTY: i64 = 300;
pub const VERY_RECENT_PENALTY: i64 = 200;
pub const RECENT_PENALTY: i64 = 50;
pub const LONG_IDLE_BONUS: i64 = 50;
pub const VERY_LONG_IDLE_BONUS: i64 = 100;

// =============================================================================
// RESOURCE MONITOR
// =============================================================================

/// Interval between resource monitor samples
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(5);

/// Process memory considered high pressure (1GB)
pub const HIGH_MEMORY_THRESHOLD: u64 = 1024 * 1024 * 1024;

/// Open handle count considered high pressure
pub const HIGH_HANDLE_THRESHOLD: u64 = 8_000;

/// Thread count considered high pressure
pub const HIGH_THREAD_THRESHOLD: u64 = 300;

// =============================================================================
// EVENTS
// =============================================================================

/// Broadcast buffer for engine events
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
