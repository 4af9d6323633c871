/*!
 * Engine Configuration
 *
 * Serializable configuration with defaults from `limits`, JSON file loading,
 * and environment overrides:
 * - TAB_HIBERNATOR_CONFIG: path to a JSON config file
 * - TAB_HIBERNATOR_ALLOW_PINNED: allow hibernating pinned tabs
 * - TAB_HIBERNATOR_ALLOW_UNSAVED: allow hibernating tabs with unsaved changes
 * - TAB_HIBERNATOR_CYCLE_CAP: candidates examined per drain cycle
 * - TAB_HIBERNATOR_MIN_DWELL_MS: minimum queue dwell time
 */

use super::errors::{HibernationError, HibernationResult};
use super::limits::*;
use super::types::Score;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::path::Path;
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "TAB_HIBERNATOR_CONFIG";
pub const ENV_ALLOW_PINNED: &str = "TAB_HIBERNATOR_ALLOW_PINNED";
pub const ENV_ALLOW_UNSAVED: &str = "TAB_HIBERNATOR_ALLOW_UNSAVED";
pub const ENV_CYCLE_CAP: &str = "TAB_HIBERNATOR_CYCLE_CAP";
pub const ENV_MIN_DWELL_MS: &str = "TAB_HIBERNATOR_MIN_DWELL_MS";

/// Priority score weights
///
/// Penalties and bonuses must be non-negative so that a longer idle time never
/// raises a tab's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PriorityWeights {
    pub baseline: Score,
    pub pinned_penalty: Score,
    pub unsaved_penalty: Score,
    pub very_recent_penalty: Score,
    pub recent_penalty: Score,
    pub long_idle_bonus: Score,
    pub very_long_idle_bonus: Score,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            baseline: PRIORITY_BASELINE,
            pinned_penalty: PINNED_PENALTY,
            unsaved_penalty: UNSAVED_PENALTY,
            very_recent_penalty: VERY_RECENT_PENALTY,
            recent_penalty: RECENT_PENALTY,
            long_idle_bonus: LONG_IDLE_BONUS,
            very_long_idle_bonus: VERY_LONG_IDLE_BONUS,
        }
    }
}

/// Resource usage levels considered high pressure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ResourceThresholds {
    pub memory_bytes: u64,
    pub handle_count: u64,
    pub thread_count: u64,
}

impl Default for ResourceThresholds {
    fn default() -> Self {
        Self {
            memory_bytes: HIGH_MEMORY_THRESHOLD,
            handle_count: HIGH_HANDLE_THRESHOLD,
            thread_count: HIGH_THREAD_THRESHOLD,
        }
    }
}

/// Hibernation engine configuration
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct HibernationConfig {
    /// Pinned tabs may be hibernated
    pub allow_pinned_hibernation: bool,
    /// Tabs with unsaved changes may be hibernated (with `Full` preservation)
    pub allow_unsaved_hibernation: bool,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub queue_interval: Duration,
    pub per_cycle_cap: usize,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub min_dwell: Duration,
    pub queue_capacity: usize,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub cleanup_interval: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub profile_retention: Duration,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub optimize_interval: Duration,
    pub optimize_batch: usize,
    pub aggressive_batch: usize,
    pub pressure_batch: usize,
    pub optimize_tab_multiple: usize,

    pub window_buffer: usize,
    pub max_window: usize,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub extended_preservation_window: Duration,
    /// Bound on a single disposal / capture / re-creation step (`None` waits forever)
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub transform_timeout: Option<Duration>,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub monitor_interval: Duration,
    pub event_capacity: usize,

    pub weights: PriorityWeights,
    pub thresholds: ResourceThresholds,
}

impl Default for HibernationConfig {
    fn default() -> Self {
        Self {
            allow_pinned_hibernation: false,
            allow_unsaved_hibernation: true,
            queue_interval: DEFAULT_QUEUE_INTERVAL,
            per_cycle_cap: DEFAULT_PER_CYCLE_CAP,
            min_dwell: DEFAULT_MIN_DWELL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            profile_retention: DEFAULT_PROFILE_RETENTION,
            optimize_interval: DEFAULT_OPTIMIZE_INTERVAL,
            optimize_batch: DEFAULT_OPTIMIZE_BATCH,
            aggressive_batch: DEFAULT_AGGRESSIVE_BATCH,
            pressure_batch: DEFAULT_PRESSURE_BATCH,
            optimize_tab_multiple: DEFAULT_OPTIMIZE_TAB_MULTIPLE,
            window_buffer: DEFAULT_WINDOW_BUFFER,
            max_window: DEFAULT_MAX_WINDOW,
            extended_preservation_window: EXTENDED_PRESERVATION_WINDOW,
            transform_timeout: Some(DEFAULT_TRANSFORM_TIMEOUT),
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            event_capacity: EVENT_CHANNEL_CAPACITY,
            weights: PriorityWeights::default(),
            thresholds: ResourceThresholds::default(),
        }
    }
}

impl HibernationConfig {
    /// Visible window capacity: the active tab plus its buffer, capped at `max_window`
    pub fn window_capacity(&self) -> usize {
        self.window_buffer.saturating_add(1).min(self.max_window)
    }

    /// Load configuration from a JSON file (missing fields take defaults)
    pub fn from_json_file(path: impl AsRef<Path>) -> HibernationResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            HibernationError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            HibernationError::InvalidConfig(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment
    pub fn from_env() -> HibernationResult<Self> {
        let mut config = match std::env::var(ENV_CONFIG_PATH) {
            Ok(path) if !path.is_empty() => Self::from_json_file(path)?,
            _ => Self::default(),
        };

        if let Some(value) = env_bool(ENV_ALLOW_PINNED)? {
            config.allow_pinned_hibernation = value;
        }
        if let Some(value) = env_bool(ENV_ALLOW_UNSAVED)? {
            config.allow_unsaved_hibernation = value;
        }
        if let Some(value) = env_u64(ENV_CYCLE_CAP)? {
            config.per_cycle_cap = value as usize;
        }
        if let Some(value) = env_u64(ENV_MIN_DWELL_MS)? {
            config.min_dwell = Duration::from_millis(value);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> HibernationResult<()> {
        let positive_counts = [
            ("per_cycle_cap", self.per_cycle_cap),
            ("queue_capacity", self.queue_capacity),
            ("optimize_batch", self.optimize_batch),
            ("aggressive_batch", self.aggressive_batch),
            ("pressure_batch", self.pressure_batch),
            ("optimize_tab_multiple", self.optimize_tab_multiple),
            ("max_window", self.max_window),
            ("event_capacity", self.event_capacity),
        ];
        for (name, value) in positive_counts {
            if value == 0 {
                return Err(HibernationError::InvalidConfig(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        let positive_intervals = [
            ("queue_interval", self.queue_interval),
            ("cleanup_interval", self.cleanup_interval),
            ("optimize_interval", self.optimize_interval),
            ("monitor_interval", self.monitor_interval),
        ];
        for (name, value) in positive_intervals {
            if value.is_zero() {
                return Err(HibernationError::InvalidConfig(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        let w = &self.weights;
        let adjustments = [
            w.pinned_penalty,
            w.unsaved_penalty,
            w.very_recent_penalty,
            w.recent_penalty,
            w.long_idle_bonus,
            w.very_long_idle_bonus,
        ];
        if adjustments.iter().any(|&v| v < 0) {
            return Err(HibernationError::InvalidConfig(
                "priority penalties and bonuses must be non-negative".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_bool(key: &str) -> HibernationResult<Option<bool>> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            other => Err(HibernationError::InvalidConfig(format!(
                "{} must be a boolean, got '{}'",
                key, other
            ))),
        },
        Err(_) => Ok(None),
    }
}

fn env_u64(key: &str) -> HibernationResult<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<u64>().map(Some).map_err(|e| {
            HibernationError::InvalidConfig(format!("{} must be an integer: {}", key, e))
        }),
        Err(_) => Ok(None),
    }
}
