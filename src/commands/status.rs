// ABOUTME: Status command implementation
// ABOUTME: Reports per-table row counts and last-modified timestamps on both hosts

use crate::config::SyncConfig;
use crate::postgres::connect;
use crate::sync::{schema, stats};
use crate::utils::validate_connection_string;
use anyhow::{Context, Result};

fn describe(modified: &stats::MaxModified) -> String {
    match modified {
        stats::MaxModified::At(ts) => format!("{:?}", ts),
        stats::MaxModified::Unavailable => "not change-tracked".to_string(),
    }
}

/// Report how far apart source and target copies of each table are, without
/// mutating anything. Uses the same row-count and max-modified probes the
/// sync fast path uses.
pub async fn status(
    source_url: &str,
    target_url: &str,
    tables: &[String],
    config: &SyncConfig,
) -> Result<()> {
    validate_connection_string(source_url)?;
    validate_connection_string(target_url)?;

    let source = connect(source_url)
        .await
        .context("Failed to connect to source database")?;
    let target = connect(target_url)
        .await
        .context("Failed to connect to target database")?;

    tracing::info!("========================================");
    tracing::info!("Table Sync Status");
    tracing::info!("========================================");

    for table in tables {
        if !schema::table_exists(&source, table).await {
            tracing::warn!("'{}': missing on source", table);
            continue;
        }
        if !schema::table_exists(&target, table).await {
            tracing::warn!("'{}': missing on target (full copy needed)", table);
            continue;
        }

        let source_count = stats::get_row_count(&source, table)
            .await
            .with_context(|| format!("Failed to count source rows of '{}'", table))?;
        let target_count = stats::get_row_count(&target, table)
            .await
            .with_context(|| format!("Failed to count target rows of '{}'", table))?;

        let source_modified =
            stats::get_table_max_modified(&source, table, &config.modified_column).await;
        let target_modified =
            stats::get_table_max_modified(&target, table, &config.modified_column).await;

        let in_sync = source_count == target_count
            && !source_modified.is_unavailable()
            && source_modified == target_modified;

        tracing::info!(
            "'{}': source {} row(s) (modified: {}), target {} row(s) (modified: {}){}",
            table,
            source_count,
            describe(&source_modified),
            target_count,
            describe(&target_modified),
            if in_sync { " — in sync" } else { "" }
        );
    }

    Ok(())
}
