//! Stream live activity.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use watch_client::{live_feeds, ClientConfig};
use watch_core::Watcher;

use crate::FeedSelection;

/// Run the watch command.
pub async fn run(config: &ClientConfig, feed: FeedSelection, duration: Option<u64>) -> Result<()> {
    let feeds = live_feeds(config).context("Failed to connect to docker/etcd")?;

    let mut watchers = Vec::new();
    if feed != FeedSelection::Mutations {
        watchers.push(
            Watcher::new("containers", config.watch.clone())
                .with_source(Arc::clone(&feeds.containers))
                .with_resolver(Arc::clone(&feeds.resolver)),
        );
    }
    if feed != FeedSelection::Containers {
        watchers.push(
            Watcher::new("mutations", config.watch.clone())
                .with_source(Arc::clone(&feeds.mutations)),
        );
    }
    for watcher in &watchers {
        watcher.start().context("Failed to start watcher")?;
    }

    println!("=== navy-watch ===");
    println!("etcd: {}", config.etcd.endpoint);
    match duration {
        Some(secs) => println!("watching for {}s", secs),
        None => println!("watching until Ctrl-C"),
    }
    println!();

    let deadline = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    let mut printed = vec![0usize; watchers.len()];
    let mut ticker = tokio::time::interval(config.watch.poll_interval());
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut interrupted => break,
            _ = ticker.tick() => {
                for (watcher, seen) in watchers.iter().zip(printed.iter_mut()) {
                    let activity = watcher.activity().await;
                    for line in activity.iter().skip(*seen) {
                        println!("[{}] {}", watcher.label(), line);
                    }
                    *seen = activity.len();
                }
            }
        }
    }

    for watcher in &watchers {
        watcher.abort().await;
        watcher.dump_activity().await;
    }
    Ok(())
}
