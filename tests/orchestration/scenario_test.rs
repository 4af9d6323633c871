/*!
 * End-to-end orchestration scenarios
 */

use crate::common::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tab_hibernator::{HibernationConfig, HibernationError, HibernationReason, Tab, TabState};

#[tokio::test]
async fn test_optimize_hibernates_only_the_idle_tab() {
    let manager = manager_with(HibernationConfig {
        optimize_batch: 1,
        ..test_config()
    });
    manager.register_tab(idle_tab(1, MINUTE), document()).unwrap();
    manager.register_tab(idle_tab(2, 10 * MINUTE), document()).unwrap();
    manager.register_tab(idle_tab(3, 3 * HOUR), document()).unwrap();
    manager.activate_tab(1).await.unwrap();

    let result = manager.optimize_now(false).await.unwrap();

    assert_eq!(result.hibernated, vec![3]);
    assert_eq!(result.tabs_affected, 1);
    assert!(result.success);
    assert_eq!(manager.tab_state(1), Some(TabState::Normal));
    assert_eq!(manager.tab_state(2), Some(TabState::Normal));
    assert_eq!(manager.tab_state(3), Some(TabState::Hibernated));
    assert_eq!(manager.memory_saved(), result.memory_delta);
}

#[tokio::test]
async fn test_aggressive_optimize_spares_pinned_tab() {
    let manager = manager_with(test_config());
    manager
        .register_tab(idle_tab(5, 48 * HOUR).pinned(true), document())
        .unwrap();

    let result = manager.optimize_now(true).await.unwrap();

    assert_eq!(result.tabs_affected, 0);
    assert_eq!(result.memory_delta, 0);
    assert!(result.success);
    assert_eq!(manager.tab_state(5), Some(TabState::Normal));
}

#[tokio::test]
async fn test_optimize_skips_window_members() {
    let manager = manager_with(test_config());
    for id in 1..=3 {
        manager.register_tab(idle_tab(id, 5 * HOUR), document()).unwrap();
    }
    manager.activate_tab(1).await.unwrap();
    manager.activate_tab(2).await.unwrap();
    // Activation resets idle time, age tab 1 again through a fresh registration
    manager.unregister_tab(1).await.unwrap();
    manager.register_tab(idle_tab(1, 5 * HOUR), document()).unwrap();

    let regular = manager.optimize_now(false).await.unwrap();
    assert_eq!(regular.hibernated, vec![1, 3]);

    assert_eq!(manager.tab_state(2), Some(TabState::Normal));
    assert_eq!(manager.window(), vec![2]);
}

#[tokio::test]
async fn test_window_eviction_queues_and_drains() {
    let manager = manager_with(HibernationConfig {
        window_buffer: 1,
        ..test_config()
    });
    for id in 1..=3 {
        manager.register_tab(idle_tab(id, 5 * HOUR), document()).unwrap();
    }

    manager.activate_tab(1).await.unwrap();
    manager.activate_tab(2).await.unwrap();
    assert_eq!(manager.queued_candidates(), 0);

    manager.activate_tab(3).await.unwrap();
    assert_eq!(manager.window(), vec![3, 2]);
    assert_eq!(manager.queued_candidates(), 1);

    let report = manager.drain_queue_now().await;
    assert_eq!(report.examined, 1);
    assert_eq!(report.hibernated, vec![1]);
    assert_eq!(manager.tab_state(1), Some(TabState::Hibernated));
    assert_eq!(manager.queued_candidates(), 0);

    let activation = manager.activate_tab(1).await.unwrap();
    assert!(activation.reactivated.is_some());
    assert_eq!(activation.previous, Some(3));
    assert_eq!(manager.tab_state(1), Some(TabState::Normal));
    assert_eq!(manager.window(), vec![1, 3]);
    assert_eq!(manager.queued_candidates(), 1);
}

#[tokio::test]
async fn test_activation_supersedes_queued_intent() {
    let manager = manager_with(test_config());
    manager.register_tab(idle_tab(1, 5 * HOUR), document()).unwrap();

    manager.schedule_hibernate(1, HibernationReason::Manual).unwrap();
    assert_eq!(manager.queued_candidates(), 1);

    manager.activate_tab(1).await.unwrap();
    assert_eq!(manager.queued_candidates(), 0);

    let report = manager.drain_queue_now().await;
    assert_eq!(report.examined, 0);
    assert_eq!(manager.tab_state(1), Some(TabState::Normal));
}

#[tokio::test]
async fn test_drain_respects_cycle_cap() {
    let manager = manager_with(HibernationConfig {
        per_cycle_cap: 2,
        ..test_config()
    });
    for id in 1..=5 {
        manager.register_tab(idle_tab(id, 5 * HOUR), document()).unwrap();
        manager.schedule_hibernate(id, HibernationReason::Automatic).unwrap();
    }

    let first = manager.drain_queue_now().await;
    assert_eq!(first.examined, 2);
    assert_eq!(first.hibernated, vec![1, 2]);
    assert_eq!(manager.queued_candidates(), 3);
    assert_eq!(manager.hibernated_count(), 2);

    let second = manager.drain_queue_now().await;
    assert_eq!(second.hibernated, vec![3, 4]);
    let third = manager.drain_queue_now().await;
    assert_eq!(third.hibernated, vec![5]);
    assert_eq!(manager.hibernated_count(), 5);
}

#[tokio::test]
async fn test_drain_skips_ineligible_candidates() {
    let manager = manager_with(test_config());
    manager
        .register_tab(idle_tab(1, 5 * HOUR).pinned(true), document())
        .unwrap();
    manager.register_tab(idle_tab(2, 5 * HOUR), document()).unwrap();
    manager.schedule_hibernate(1, HibernationReason::Automatic).unwrap();
    manager.schedule_hibernate(2, HibernationReason::Automatic).unwrap();
    manager.unregister_tab(2).await.unwrap();

    let report = manager.drain_queue_now().await;
    assert_eq!(report.examined, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.hibernated.is_empty());
    assert_eq!(manager.tab_state(1), Some(TabState::Normal));
}

#[tokio::test]
async fn test_schedule_unknown_tab() {
    let manager = manager_with(test_config());
    assert_eq!(
        manager.schedule_hibernate(42, HibernationReason::Manual),
        Err(HibernationError::TabNotFound(42))
    );
}

#[tokio::test]
async fn test_unregister_hibernated_tab_releases_savings() {
    let manager = manager_with(test_config());
    let tab = Tab::new(8, "Notes.md", "/docs/Notes.md")
        .with_metadata("cursor", 42)
        .idle_for(5 * HOUR);
    manager.register_tab(tab, document()).unwrap();
    manager
        .request_hibernate(8, HibernationReason::Manual)
        .await
        .unwrap();
    assert!(manager.memory_saved() > 0);

    let closed = manager.unregister_tab(8).await.unwrap();

    assert_eq!(closed.title, "Notes.md");
    assert_eq!(closed.metadata.get("cursor"), Some(&serde_json::json!(42)));
    assert_eq!(manager.memory_saved(), 0);
    assert_eq!(manager.tab(8), None);
    assert_eq!(manager.stats().total_tabs, 0);
    assert_eq!(manager.stats().tracked_profiles, 0);
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let manager = manager_with(test_config());
    manager.register_tab(idle_tab(1, HOUR), document()).unwrap();
    assert_eq!(
        manager.register_tab(idle_tab(1, HOUR), document()),
        Err(HibernationError::AlreadyRegistered(1))
    );
}

#[tokio::test]
async fn test_loading_tab_is_not_hibernated() {
    let manager = manager_with(test_config());
    manager.register_tab(idle_tab(1, 5 * HOUR), document()).unwrap();
    manager.mark_loading(1).await.unwrap();

    let result = manager.optimize_now(true).await.unwrap();
    assert_eq!(result.tabs_affected, 0);
    assert_eq!(manager.tab_state(1), Some(TabState::Loading));

    manager.mark_loaded(1).await.unwrap();
    let result = manager.optimize_now(true).await.unwrap();
    assert_eq!(result.hibernated, vec![1]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_window_never_keeps_closed_tabs() {
    let manager = Arc::new(manager_with(test_config()));

    for round in 0..200u64 {
        let id = round + 1;
        manager.register_tab(idle_tab(id, MINUTE), document()).unwrap();

        let activating = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                let _ = manager.activate_tab(id).await;
            })
        };
        let closing = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                let _ = manager.unregister_tab(id).await;
            })
        };
        activating.await.unwrap();
        closing.await.unwrap();

        assert_eq!(manager.tab(id), None);
        assert!(
            !manager.window().contains(&id),
            "closed tab {} still in window",
            id
        );
    }
    assert!(manager.window().is_empty());
}
