/*!
 * Monitoring Module
 * Events, statistics, resource sampling and tracing setup
 */

pub mod events;
pub mod resource;
pub mod stats;
pub mod tracer;

pub use events::{EventBroadcaster, TabEvent};
pub use resource::{NullResourceMonitor, PressureLevel, ResourceMonitor, ResourceSample};
pub use stats::{AtomicHibernationStats, HibernationStats};
pub use tracer::{generate_trace_id, init_tracing, sweep_span, transform_span};
