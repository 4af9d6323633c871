/*!
 * Tab Module
 * Tab descriptors, content capabilities and the registry that owns them
 */

pub mod content;
pub mod registry;
pub mod types;

pub use content::{
    ContentFactory, ContentKind, ExtendedState, InMemoryContent, InMemoryContentFactory,
    TabContent,
};
pub use registry::TabRegistry;
pub use types::{HibernationReason, PreservationLevel, Tab, TabMetadata, TabState};
