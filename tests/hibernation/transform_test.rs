/*!
 * Hibernate / reactivate transform tests
 */

use crate::common::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tab_hibernator::{
    HibernateOutcome, HibernationConfig, HibernationError, HibernationReason, IneligibleReason,
    PreservationLevel, Tab, TabEvent, TabState,
};

#[tokio::test]
async fn test_activate_hibernated_tab_restores_it() {
    let manager = manager_with(test_config());
    let tab = Tab::new(4, "Report.pdf", "/docs/Report.pdf").idle_for(3 * HOUR);
    manager.register_tab(tab, document()).unwrap();

    let outcome = manager
        .request_hibernate(4, HibernationReason::Manual)
        .await
        .unwrap();
    let freed = outcome.memory_freed();
    assert!(freed > 0);
    assert_eq!(manager.memory_saved(), freed);

    let mut events = manager.subscribe();
    let report = manager.activate_tab(4).await.unwrap();

    let reactivated = report.reactivated.expect("activation should reactivate");
    assert_eq!(reactivated.memory_restored, freed);
    assert_eq!(manager.tab_state(4), Some(TabState::Normal));
    assert_eq!(manager.tab(4).unwrap().title, "Report.pdf");
    assert!(!manager.tab(4).unwrap().pinned);
    assert_eq!(manager.memory_saved(), 0);
    assert_eq!(manager.active_tab(), Some(4));

    match events.recv().await.unwrap() {
        TabEvent::TabReactivated {
            id,
            memory_restored,
            ..
        } => {
            assert_eq!(id, 4);
            assert_eq!(memory_restored, freed);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_reactivate_never_hibernated_tab_is_noop() {
    let manager = manager_with(test_config());
    manager.register_tab(idle_tab(1, 3 * HOUR), document()).unwrap();
    manager.register_tab(idle_tab(2, 3 * HOUR), document()).unwrap();

    let outcome = manager
        .request_hibernate(1, HibernationReason::Automatic)
        .await
        .unwrap();
    assert!(outcome.is_hibernated());
    let saved = manager.memory_saved();
    let before = manager.tab(2).unwrap();

    assert_eq!(
        manager.request_reactivate(2).await,
        Err(HibernationError::NotHibernated(2))
    );
    assert_eq!(manager.tab(2).unwrap(), before);
    assert_eq!(manager.tab_state(1), Some(TabState::Hibernated));
    assert_eq!(manager.memory_saved(), saved);
}

#[tokio::test]
async fn test_unknown_tabs() {
    let manager = manager_with(test_config());

    assert_eq!(
        manager.request_reactivate(9).await,
        Err(HibernationError::TabNotFound(9))
    );
    assert_eq!(
        manager.activate_tab(9).await.unwrap_err(),
        HibernationError::TabNotFound(9)
    );
    assert_eq!(
        manager
            .request_hibernate(9, HibernationReason::Manual)
            .await
            .unwrap(),
        HibernateOutcome::Declined(IneligibleReason::NotRegistered)
    );
}

#[tokio::test]
async fn test_round_trip_preserves_descriptor() {
    let manager = manager_with(HibernationConfig {
        allow_pinned_hibernation: true,
        ..test_config()
    });
    let original = Tab::new(7, "Budget.xlsx", "/finance/Budget.xlsx")
        .with_color("#22aa55")
        .pinned(true)
        .with_metadata("tags", serde_json::json!(["finance", "2026"]))
        .with_metadata("zoom", 1.25)
        .idle_for(5 * HOUR);
    manager.register_tab(original.clone(), document()).unwrap();

    manager
        .request_hibernate(7, HibernationReason::Manual)
        .await
        .unwrap();
    let hibernated = manager.tab(7).unwrap();
    assert!(hibernated.metadata.is_empty());

    manager.request_reactivate(7).await.unwrap();
    let restored = manager.tab(7).unwrap();

    assert_eq!(restored.title, original.title);
    assert_eq!(restored.path, original.path);
    assert_eq!(restored.color, original.color);
    assert_eq!(restored.pinned, original.pinned);
    assert_eq!(restored.metadata, original.metadata);
}

#[tokio::test]
async fn test_preservation_levels() {
    let manager = manager_with(HibernationConfig {
        allow_pinned_hibernation: true,
        ..test_config()
    });
    manager.register_tab(idle_tab(1, 5 * HOUR), document()).unwrap();
    manager.register_tab(idle_tab(2, 10 * MINUTE), document()).unwrap();
    manager
        .register_tab(idle_tab(3, 5 * HOUR).pinned(true), document())
        .unwrap();
    manager
        .register_tab(idle_tab(4, 5 * HOUR).with_unsaved_changes(true), document())
        .unwrap();

    let mut levels = Vec::new();
    for id in 1..=4 {
        match manager
            .request_hibernate(id, HibernationReason::Manual)
            .await
            .unwrap()
        {
            HibernateOutcome::Hibernated(report) => levels.push(report.level),
            other => panic!("tab {} not hibernated: {:?}", id, other),
        }
    }

    assert_eq!(
        levels,
        vec![
            PreservationLevel::Basic,
            PreservationLevel::Extended,
            PreservationLevel::Extended,
            PreservationLevel::Full,
        ]
    );
}

#[tokio::test]
async fn test_event_follows_state() {
    let manager = Arc::new(manager_with(test_config()));
    manager.register_tab(idle_tab(1, 3 * HOUR), document()).unwrap();

    let mut events = manager.subscribe();
    let observer = {
        let manager = manager.clone();
        tokio::spawn(async move {
            loop {
                if let TabEvent::TabHibernated { id, .. } = events.recv().await.unwrap() {
                    return manager.tab_state(id);
                }
            }
        })
    };

    manager
        .request_hibernate(1, HibernationReason::Manual)
        .await
        .unwrap();
    assert_eq!(observer.await.unwrap(), Some(TabState::Hibernated));
}

#[tokio::test]
async fn test_concurrent_transforms_on_one_tab() {
    let manager = Arc::new(manager_with(test_config()));
    manager.register_tab(idle_tab(1, 3 * HOUR), document()).unwrap();

    let mut handles = Vec::new();
    for round in 0..8 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            if round % 2 == 0 {
                let _ = manager.request_hibernate(1, HibernationReason::Manual).await;
            } else {
                let _ = manager.request_reactivate(1).await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let state = manager.tab_state(1).unwrap();
    assert!(matches!(state, TabState::Normal | TabState::Hibernated));
    let expected = if state == TabState::Hibernated {
        manager.stats().memory_saved
    } else {
        0
    };
    assert_eq!(manager.memory_saved(), expected);
    assert_eq!(manager.hibernated_count(), usize::from(state == TabState::Hibernated));
}
