/*!
 * Manager Module
 * Orchestration layer exposed to the surrounding application
 */

mod builder;
#[allow(clippy::module_inception)]
mod manager;
mod optimize;

pub use builder::TabManagerBuilder;
pub use manager::TabManager;
pub use optimize::OptimizationResult;
