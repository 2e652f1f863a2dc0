// ABOUTME: Sync command implementation
// ABOUTME: Connects both hosts and synchronizes each requested table in turn

use crate::config::SyncConfig;
use crate::postgres::connect;
use crate::sync::{sync_table, SyncOutcome};
use crate::utils::validate_connection_string;
use anyhow::{Context, Result};

/// Synchronize the given tables from source to target.
///
/// Tables are processed sequentially on one pair of connections. A failure
/// on one table is fatal for that table only; the remaining tables still
/// run, and the command errors at the end if any table failed.
pub async fn sync(
    source_url: &str,
    target_url: &str,
    tables: &[String],
    config: &SyncConfig,
) -> Result<()> {
    validate_connection_string(source_url)?;
    validate_connection_string(target_url)?;

    tracing::info!("Connecting to source database...");
    let source = connect(source_url)
        .await
        .context("Failed to connect to source database")?;

    tracing::info!("Connecting to target database...");
    let target = connect(target_url)
        .await
        .context("Failed to connect to target database")?;

    let mut failed: Vec<String> = Vec::new();
    for table in tables {
        match sync_table(&source, &target, config, table).await {
            Ok(SyncOutcome::Unchanged) => {
                tracing::info!("✓ '{}' already in sync", table);
            }
            Ok(SyncOutcome::Recreated { rows_copied }) => {
                tracing::info!("✓ '{}' recreated, {} row(s) copied", table, rows_copied);
            }
            Ok(SyncOutcome::Synced {
                rows_deleted,
                rows_copied,
            }) => {
                tracing::info!(
                    "✓ '{}' synced: {} row(s) deleted, {} row(s) copied",
                    table,
                    rows_deleted,
                    rows_copied
                );
            }
            Err(e) => {
                tracing::error!("✗ '{}' failed: {:#}", table, e);
                failed.push(table.clone());
            }
        }
    }

    if !failed.is_empty() {
        anyhow::bail!(
            "Sync failed for {} of {} table(s): {}",
            failed.len(),
            tables.len(),
            failed.join(", ")
        );
    }

    tracing::info!("All {} table(s) synchronized", tables.len());
    Ok(())
}
