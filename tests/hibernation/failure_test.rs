/*!
 * Failure path tests
 * Disposal, capture and re-creation failures leave tabs consistent
 */

use crate::common::*;
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tab_hibernator::{
    HibernationConfig, HibernationError, HibernationReason, TabManagerBuilder, TabState,
};

#[tokio::test]
async fn test_dispose_failure_leaves_tab_resident() {
    let manager = manager_with(test_config());
    let controls = ContentControls::default();
    controls.fail_dispose.store(true, Ordering::SeqCst);
    manager
        .register_tab(idle_tab(1, 3 * HOUR), ControlledContent::boxed(&controls))
        .unwrap();

    let err = manager
        .request_hibernate(1, HibernationReason::Manual)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HibernationError::TransformFailed { id: 1, ref operation, .. } if operation == "dispose"
    ));

    assert_eq!(manager.tab_state(1), Some(TabState::Normal));
    assert_eq!(manager.memory_saved(), 0);
    assert_eq!(manager.hibernated_count(), 0);
    let stats = manager.stats();
    assert_eq!(stats.failed_hibernations, 1);
    assert_eq!(stats.hibernations, 0);

    controls.fail_dispose.store(false, Ordering::SeqCst);
    let outcome = manager
        .request_hibernate(1, HibernationReason::Manual)
        .await
        .unwrap();
    assert!(outcome.is_hibernated());
    assert_eq!(controls.disposals.load(Ordering::SeqCst), 1);
    assert_eq!(manager.memory_saved(), outcome.memory_freed());
}

#[tokio::test]
async fn test_capture_failure_leaves_tab_resident() {
    let manager = manager_with(test_config());
    let controls = ContentControls::default();
    controls.fail_capture.store(true, Ordering::SeqCst);
    // Recently used tabs capture extended state
    manager
        .register_tab(idle_tab(1, 10 * MINUTE), ControlledContent::boxed(&controls))
        .unwrap();

    let err = manager
        .request_hibernate(1, HibernationReason::Manual)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HibernationError::TransformFailed { ref operation, .. } if operation == "capture_state"
    ));

    assert_eq!(manager.tab_state(1), Some(TabState::Normal));
    assert_eq!(controls.disposals.load(Ordering::SeqCst), 0);
    assert_eq!(manager.memory_saved(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_dispose_times_out() {
    let manager = manager_with(HibernationConfig {
        transform_timeout: Some(Duration::from_secs(2)),
        ..test_config()
    });
    let controls = ContentControls::default();
    controls.hang_dispose.store(true, Ordering::SeqCst);
    manager
        .register_tab(idle_tab(1, 3 * HOUR), ControlledContent::boxed(&controls))
        .unwrap();

    let err = manager
        .request_hibernate(1, HibernationReason::Manual)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        HibernationError::Timeout {
            id: 1,
            operation: "dispose".to_string(),
            timeout_ms: 2000,
        }
    );
    assert_eq!(manager.tab_state(1), Some(TabState::Normal));
    assert_eq!(manager.stats().failed_hibernations, 1);
}

#[tokio::test]
async fn test_reactivation_failure_moves_tab_to_error() {
    let factory = ToggleFactory::default();
    let manager = TabManagerBuilder::new()
        .with_config(test_config())
        .with_content_factory(Arc::new(factory.clone()))
        .build()
        .unwrap();
    manager.register_tab(idle_tab(1, 3 * HOUR), document()).unwrap();

    manager
        .request_hibernate(1, HibernationReason::Manual)
        .await
        .unwrap();

    factory.fail.store(true, Ordering::SeqCst);
    let err = manager.request_reactivate(1).await.unwrap_err();
    assert!(matches!(
        err,
        HibernationError::TransformFailed { ref operation, .. } if operation == "create"
    ));
    assert_eq!(manager.tab_state(1), Some(TabState::Error));
    assert_eq!(manager.memory_saved(), 0);
    assert_eq!(manager.stats().failed_reactivations, 1);
    assert_eq!(manager.stats().errored_tabs, 1);

    // Errored tabs are neither hibernatable nor reactivatable
    assert_eq!(
        manager.request_reactivate(1).await,
        Err(HibernationError::NotHibernated(1))
    );

    factory.fail.store(false, Ordering::SeqCst);
    manager.reset_error(1).await.unwrap();
    assert_eq!(manager.tab_state(1), Some(TabState::Normal));
    assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    assert_eq!(manager.tab(1).unwrap().title, "Tab 1");
}

#[tokio::test]
async fn test_restore_failure_releases_recreated_content() {
    let factory = ControlledFactory::default();
    let controls = factory.controls.clone();
    let manager = TabManagerBuilder::new()
        .with_config(test_config())
        .with_content_factory(Arc::new(factory.clone()))
        .build()
        .unwrap();
    // Recently used tabs keep extended state, so reactivation restores it
    manager
        .register_tab(idle_tab(1, 10 * MINUTE), ControlledContent::boxed(&controls))
        .unwrap();

    let outcome = manager
        .request_hibernate(1, HibernationReason::Manual)
        .await
        .unwrap();
    assert!(outcome.memory_freed() > 0);
    assert_eq!(controls.disposals.load(Ordering::SeqCst), 1);

    controls.fail_restore.store(true, Ordering::SeqCst);
    let err = manager.request_reactivate(1).await.unwrap_err();

    assert!(matches!(
        err,
        HibernationError::TransformFailed { id: 1, ref operation, .. } if operation == "restore_state"
    ));
    assert_eq!(manager.tab_state(1), Some(TabState::Error));
    assert_eq!(manager.stats().failed_reactivations, 1);
    assert_eq!(manager.memory_saved(), 0);
    assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    assert_eq!(controls.disposals.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_reset_error_requires_error_state() {
    let manager = manager_with(test_config());
    manager.register_tab(idle_tab(1, HOUR), document()).unwrap();

    assert!(matches!(
        manager.reset_error(1).await,
        Err(HibernationError::InvalidState { id: 1, .. })
    ));
}

#[tokio::test]
async fn test_sweep_continues_past_failures() {
    let manager = manager_with(test_config());
    let controls = ContentControls::default();
    controls.fail_dispose.store(true, Ordering::SeqCst);

    manager.register_tab(idle_tab(1, 5 * HOUR), document()).unwrap();
    manager
        .register_tab(idle_tab(2, 6 * HOUR), ControlledContent::boxed(&controls))
        .unwrap();
    manager.register_tab(idle_tab(3, 5 * HOUR), document()).unwrap();

    let result = manager.optimize_now(true).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.failures, vec![2]);
    assert_eq!(result.tabs_affected, 2);
    assert!(result.hibernated.contains(&1));
    assert!(result.hibernated.contains(&3));
    assert_eq!(manager.tab_state(2), Some(TabState::Normal));
    assert_eq!(manager.memory_saved(), result.memory_delta);
}

#[tokio::test]
async fn test_unregister_tolerates_dispose_failure() {
    let manager = manager_with(test_config());
    let controls = ContentControls::default();
    controls.fail_dispose.store(true, Ordering::SeqCst);
    manager
        .register_tab(idle_tab(1, HOUR), ControlledContent::boxed(&controls))
        .unwrap();

    let tab = manager.unregister_tab(1).await.unwrap();
    assert_eq!(tab.id, 1);
    assert_eq!(manager.tab(1), None);
    assert!(manager.tabs().is_empty());
}
