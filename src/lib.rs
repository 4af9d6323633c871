/*!
 * Tab Hibernator Library
 * Keeps the memory footprint of many long-lived tabs bounded by hibernating
 * idle ones and restoring them transparently on activation
 */

pub mod core;
pub mod hibernation;
pub mod manager;
pub mod monitoring;
pub mod policy;
pub mod scheduler;
pub mod tab;
pub mod visibility;

// Re-exports
pub use crate::core::{
    ContentError, HibernationConfig, HibernationError, HibernationResult, PriorityWeights,
    ResourceThresholds, Score, Size, TabId, Timestamp,
};
pub use hibernation::{
    ActivationReport, DefaultSizeEstimator, HibernateOutcome, HibernatedSnapshot,
    HibernationEngine, HibernationReport, MemoryProfile, ReactivationReport, SizeEstimator,
    SweepKind, SweepReport,
};
pub use manager::{OptimizationResult, TabManager, TabManagerBuilder};
pub use monitoring::{
    init_tracing, HibernationStats, NullResourceMonitor, PressureLevel, ResourceMonitor,
    ResourceSample, TabEvent,
};
pub use policy::{IneligibleReason, PolicyContext, RecommendedAction};
pub use scheduler::{DrainReport, HibernationCandidate};
pub use tab::{
    ContentFactory, ContentKind, ExtendedState, HibernationReason, InMemoryContent,
    InMemoryContentFactory, PreservationLevel, Tab, TabContent, TabMetadata, TabRegistry,
    TabState,
};
pub use visibility::{VisibilityManager, WindowUpdate};
