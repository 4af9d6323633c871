/*!
 * Tab Manager Builder
 * Composition root: wires configuration and collaborators into one manager
 */

use super::manager::{ManagerInner, TabManager};
use crate::core::config::HibernationConfig;
use crate::core::errors::HibernationResult;
use crate::hibernation::{DefaultSizeEstimator, HibernationEngine, SizeEstimator};
use crate::monitoring::{EventBroadcaster, NullResourceMonitor, ResourceMonitor};
use crate::scheduler::{CandidateQueue, CandidateScheduler};
use crate::tab::{ContentFactory, InMemoryContentFactory, TabRegistry};
use crate::visibility::VisibilityManager;
use arc_swap::ArcSwap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Builds a `TabManager`; every collaborator has a working default
pub struct TabManagerBuilder {
    config: HibernationConfig,
    factory: Option<Arc<dyn ContentFactory>>,
    estimator: Option<Arc<dyn SizeEstimator>>,
    monitor: Option<Arc<dyn ResourceMonitor>>,
}

impl TabManagerBuilder {
    pub fn new() -> Self {
        Self {
            config: HibernationConfig::default(),
            factory: None,
            estimator: None,
            monitor: None,
        }
    }

    pub fn with_config(mut self, config: HibernationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_content_factory(mut self, factory: Arc<dyn ContentFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_size_estimator(mut self, estimator: Arc<dyn SizeEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn with_resource_monitor(mut self, monitor: Arc<dyn ResourceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Validate the configuration and assemble the manager
    ///
    /// Background tasks are not started until `TabManager::start`.
    pub fn build(self) -> HibernationResult<TabManager> {
        self.config.validate()?;

        let window_capacity = self.config.window_capacity();
        let queue_capacity = self.config.queue_capacity;
        let events = EventBroadcaster::new(self.config.event_capacity);
        let config = Arc::new(ArcSwap::from_pointee(self.config));

        let registry = Arc::new(TabRegistry::new());
        let engine = Arc::new(HibernationEngine::new(
            registry.clone(),
            self.factory
                .unwrap_or_else(|| Arc::new(InMemoryContentFactory::new())),
            self.estimator.unwrap_or_else(|| Arc::new(DefaultSizeEstimator)),
            config.clone(),
            events,
        ));
        let visibility = Arc::new(VisibilityManager::new(registry, window_capacity));
        let scheduler = Arc::new(CandidateScheduler::new(
            engine.clone(),
            Arc::new(CandidateQueue::new(queue_capacity)),
            visibility.clone(),
        ));

        Ok(TabManager::from_parts(ManagerInner {
            config,
            engine,
            scheduler,
            visibility,
            monitor: self.monitor.unwrap_or_else(|| Arc::new(NullResourceMonitor)),
            monitor_degraded: AtomicBool::new(false),
        }))
    }
}

impl Default for TabManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
