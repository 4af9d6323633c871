/*!
 * Manager lifecycle tests
 * Start, background cycles under paused time, reconfiguration, shutdown
 */

use crate::common::*;
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tab_hibernator::{
    HibernationConfig, HibernationError, HibernationReason, ResourceSample, TabEvent, TabState,
};

#[tokio::test(start_paused = true)]
async fn test_periodic_optimize_publishes_stats() {
    let manager = manager_with(test_config());
    // Default window holds 9 tabs, so 20 tabs exceed two windows
    for id in 1..=20 {
        manager.register_tab(idle_tab(id, 5 * HOUR), document()).unwrap();
    }

    let mut events = manager.subscribe();
    manager.start().unwrap();
    assert!(manager.is_started());

    let stats = loop {
        if let TabEvent::StatsUpdated(stats) = events.recv().await.unwrap() {
            break stats;
        }
    };

    assert_eq!(stats.hibernated_tabs, 5);
    assert_eq!(stats.total_tabs, 20);
    assert_eq!(stats.optimize_passes, 1);
    assert_eq!(stats.memory_saved, manager.memory_saved());
    assert_eq!(stats.average_memory_saved, stats.memory_saved / 5);

    assert_eq!(manager.shutdown().await, 15);
}

#[tokio::test(start_paused = true)]
async fn test_small_population_only_publishes_stats() {
    let manager = manager_with(test_config());
    for id in 1..=3 {
        manager.register_tab(idle_tab(id, 5 * HOUR), document()).unwrap();
    }

    let mut events = manager.subscribe();
    manager.start().unwrap();

    let stats = loop {
        if let TabEvent::StatsUpdated(stats) = events.recv().await.unwrap() {
            break stats;
        }
    };
    assert_eq!(stats.hibernated_tabs, 0);
    assert_eq!(stats.optimize_passes, 0);

    manager.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_background_drain_hibernates_queued_tabs() {
    let manager = manager_with(HibernationConfig {
        min_dwell: Duration::from_secs(60),
        ..test_config()
    });
    manager.register_tab(idle_tab(1, 5 * HOUR), document()).unwrap();
    manager.schedule_hibernate(1, HibernationReason::Automatic).unwrap();

    // Not yet past the dwell time
    assert!(manager.drain_queue_now().await.hibernated.is_empty());
    assert_eq!(manager.queued_candidates(), 1);

    let mut events = manager.subscribe();
    manager.start().unwrap();

    loop {
        if let TabEvent::TabHibernated { id, reason, .. } = events.recv().await.unwrap() {
            assert_eq!(id, 1);
            assert_eq!(reason, HibernationReason::Automatic);
            break;
        }
    }
    assert_eq!(manager.tab_state(1), Some(TabState::Hibernated));
    assert_eq!(manager.queued_candidates(), 0);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_releases_content_once() {
    let manager = manager_with(test_config());
    let controls = ContentControls::default();
    manager
        .register_tab(idle_tab(1, HOUR), ControlledContent::boxed(&controls))
        .unwrap();
    manager
        .register_tab(idle_tab(2, 5 * HOUR), ControlledContent::boxed(&controls))
        .unwrap();
    manager
        .request_hibernate(2, HibernationReason::Manual)
        .await
        .unwrap();
    manager.schedule_hibernate(1, HibernationReason::Automatic).unwrap();
    manager.start().unwrap();

    assert_eq!(manager.shutdown().await, 1);
    assert_eq!(controls.disposals.load(Ordering::SeqCst), 2);
    assert_eq!(manager.queued_candidates(), 0);
    assert!(!manager.is_started());
    // Released tabs hold no content; hibernated ones keep their snapshot
    assert_eq!(manager.tab_state(1), Some(TabState::Error));
    assert_eq!(manager.tab_state(2), Some(TabState::Hibernated));

    assert_eq!(manager.shutdown().await, 0);
    assert_eq!(controls.disposals.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_operations_rejected_after_shutdown() {
    let manager = manager_with(test_config());
    manager.register_tab(idle_tab(1, HOUR), document()).unwrap();
    manager.shutdown().await;

    assert_eq!(manager.start(), Err(HibernationError::ShuttingDown));
    assert_eq!(
        manager.register_tab(idle_tab(2, HOUR), document()),
        Err(HibernationError::ShuttingDown)
    );
    assert_eq!(
        manager.activate_tab(1).await.unwrap_err(),
        HibernationError::ShuttingDown
    );
    assert_eq!(
        manager
            .request_hibernate(1, HibernationReason::Manual)
            .await
            .unwrap_err(),
        HibernationError::ShuttingDown
    );
    assert!(matches!(
        manager.optimize_now(true).await,
        Err(HibernationError::ShuttingDown)
    ));

    assert_eq!(
        manager.mark_loading(1).await,
        Err(HibernationError::ShuttingDown)
    );
    assert_eq!(
        manager.mark_loaded(1).await,
        Err(HibernationError::ShuttingDown)
    );
    assert_eq!(
        manager.poll_resource_monitor().await,
        Err(HibernationError::ShuttingDown)
    );

    // Queries still answer
    assert_eq!(manager.tab_state(1), Some(TabState::Error));
}

#[tokio::test]
async fn test_pressure_sample_ignored_after_shutdown() {
    let manager = manager_with(test_config());
    for id in 1..=3 {
        manager.register_tab(idle_tab(id, 5 * HOUR), document()).unwrap();
    }
    manager.shutdown().await;

    let report = manager
        .handle_resource_sample(ResourceSample::new(u64::MAX, 0, 0))
        .await;

    assert!(report.is_none());
    assert!(!manager.is_under_pressure());
    assert_eq!(manager.stats().failed_hibernations, 0);
    assert_eq!(manager.hibernated_count(), 0);
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let manager = manager_with(test_config());
    manager.start().unwrap();
    manager.start().unwrap();
    assert!(manager.is_started());
    manager.shutdown().await;
}

#[tokio::test]
async fn test_update_config_shrinks_window() {
    let manager = manager_with(test_config());
    for id in 1..=4 {
        manager.register_tab(idle_tab(id, 5 * HOUR), document()).unwrap();
        manager.activate_tab(id).await.unwrap();
    }
    assert_eq!(manager.window(), vec![4, 3, 2, 1]);

    manager
        .update_config(HibernationConfig {
            window_buffer: 1,
            ..test_config()
        })
        .unwrap();

    assert_eq!(manager.window(), vec![4, 3]);
    assert_eq!(manager.queued_candidates(), 2);
    assert_eq!(manager.config().window_capacity(), 2);
    assert_eq!(manager.stats().window_capacity, 2);

    let report = manager.drain_queue_now().await;
    assert_eq!(report.hibernated.len(), 2);
    assert_eq!(manager.tab_state(1), Some(TabState::Hibernated));
    assert_eq!(manager.tab_state(2), Some(TabState::Hibernated));
}

#[tokio::test]
async fn test_update_config_rejects_invalid() {
    let manager = manager_with(test_config());
    let err = manager
        .update_config(HibernationConfig {
            per_cycle_cap: 0,
            ..test_config()
        })
        .unwrap_err();

    assert!(matches!(err, HibernationError::InvalidConfig(_)));
    assert_eq!(*manager.config(), test_config());
}

#[tokio::test]
async fn test_update_config_retunes_running_tasks() {
    let manager = manager_with(test_config());
    manager.start().unwrap();
    manager
        .update_config(HibernationConfig {
            optimize_interval: Duration::from_secs(10),
            ..test_config()
        })
        .unwrap();

    assert_eq!(manager.config().optimize_interval, Duration::from_secs(10));
    assert!(manager.is_started());
    manager.shutdown().await;
}
