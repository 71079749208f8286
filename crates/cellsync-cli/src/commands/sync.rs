use anyhow::{Context, Result};
use cellsync::{RemoteStore, RemoteSyncEngine, SyncReport};

use crate::commands::format::print_sync_report;
use crate::config::AppConfig;

/// Mirror every configured target and print the outcome.
pub async fn run(config: &AppConfig, remote: &dyn RemoteStore) -> Result<SyncReport> {
    if config.sync.is_empty() {
        println!("No sync targets configured.");
        return Ok(SyncReport::default());
    }

    println!(
        "Syncing {} targets from {}...",
        config.sync.len(),
        remote.label()
    );

    let engine = RemoteSyncEngine::new(config.root());
    let report = engine
        .sync(remote, &config.sync)
        .await
        .context("sync aborted")?;

    print_sync_report(&report);
    Ok(report)
}
