/*!
 * Resource Monitor
 *
 * Optional capability that samples process usage. Pressure is derived from
 * the configured thresholds; a monitor that cannot sample reports
 * `ResourceMonitorUnavailable` and pressure sweeps simply never fire.
 */

use crate::core::config::ResourceThresholds;
use crate::core::errors::{HibernationError, HibernationResult};
use serde::{Deserialize, Serialize};

/// Pressure classification of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureLevel {
    #[default]
    Normal,
    High,
}

impl PressureLevel {
    #[inline]
    pub fn is_high(&self) -> bool {
        matches!(self, Self::High)
    }
}

/// Point-in-time process usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceSample {
    pub memory_bytes: u64,
    pub handle_count: u64,
    pub thread_count: u64,
}

impl ResourceSample {
    pub fn new(memory_bytes: u64, handle_count: u64, thread_count: u64) -> Self {
        Self {
            memory_bytes,
            handle_count,
            thread_count,
        }
    }

    /// High when any measurement crosses its threshold
    pub fn pressure(&self, thresholds: &ResourceThresholds) -> PressureLevel {
        if self.memory_bytes >= thresholds.memory_bytes
            || self.handle_count >= thresholds.handle_count
            || self.thread_count >= thresholds.thread_count
        {
            PressureLevel::High
        } else {
            PressureLevel::Normal
        }
    }
}

/// Source of resource samples
pub trait ResourceMonitor: Send + Sync {
    fn sample(&self) -> HibernationResult<ResourceSample>;
}

/// Default monitor for hosts without one
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResourceMonitor;

impl ResourceMonitor for NullResourceMonitor {
    fn sample(&self) -> HibernationResult<ResourceSample> {
        Err(HibernationError::ResourceMonitorUnavailable(
            "no resource monitor configured".to_string(),
        ))
    }
}
