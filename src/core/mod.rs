/*!
 * Core Module
 * Fundamental types, limits, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod limits;
pub mod shards;
pub mod types;

// Re-export for convenience
pub use config::{HibernationConfig, PriorityWeights, ResourceThresholds};
pub use errors::*;
pub use shards::{shard_amount, WorkloadProfile};
pub use types::*;
