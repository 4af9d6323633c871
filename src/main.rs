/*!
 * hibernatord - Demo Host
 *
 * Runs the tab manager against a synthetic tab population until Ctrl-C:
 * - Loads configuration from the environment (TAB_HIBERNATOR_*)
 * - Registers idle and recent tabs, then activates a few
 * - Logs every engine event, with stats snapshots as JSON
 */

use anyhow::Context;
use std::time::Duration;
use tab_hibernator::{
    init_tracing, ContentKind, HibernationConfig, InMemoryContent, Tab, TabEvent,
    TabManagerBuilder,
};
use tracing::{info, warn};

const DEMO_TABS: u64 = 24;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("hibernatord starting...");

    let config = HibernationConfig::from_env().context("loading configuration")?;
    info!(
        window_capacity = config.window_capacity(),
        per_cycle_cap = config.per_cycle_cap,
        allow_pinned = config.allow_pinned_hibernation,
        "Configuration loaded"
    );

    let manager = TabManagerBuilder::new()
        .with_config(config)
        .build()
        .context("building tab manager")?;

    let mut events = manager.subscribe();
    let listener = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(TabEvent::StatsUpdated(stats)) => match stats.to_json() {
                    Ok(json) => info!(stats = %json, "Stats updated"),
                    Err(e) => warn!(error = %e, "Could not encode stats"),
                },
                Ok(event) => info!(event = ?event, "Engine event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Event listener lagged")
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    for id in 1..=DEMO_TABS {
        let path = match id % 4 {
            0 => format!("/home/demo/reports/q{}.pdf", id),
            1 => format!("/home/demo/photos/img{}.png", id),
            2 => format!("/home/demo/projects/p{}", id),
            _ => format!("/home/demo/media/clip{}.mp4", id),
        };
        let tab = Tab::new(id, format!("Tab {}", id), path.as_str())
            .pinned(id == 1)
            .idle_for(Duration::from_secs(id * 15 * 60));
        let content = InMemoryContent::new(ContentKind::classify(tab.path()));
        manager
            .register_tab(tab, Box::new(content))
            .with_context(|| format!("registering tab {}", id))?;
    }

    for id in [1, 2, 3] {
        manager.activate_tab(id).await?;
    }

    manager.start()?;
    let result = manager.optimize_now(false).await?;
    info!(
        tabs_affected = result.tabs_affected,
        memory_delta = result.memory_delta,
        "Initial optimize pass"
    );

    info!("hibernatord running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    let released = manager.shutdown().await;
    info!(released, "hibernatord stopped");
    listener.abort();
    Ok(())
}
