// ABOUTME: Per-table sync session orchestration
// ABOUTME: Reconciles schema, diffs hash sets, and transfers only the delta

pub mod bulk;
pub mod hashes;
pub mod mutate;
pub mod schema;
pub mod stats;

use crate::config::SyncConfig;
use crate::utils::{quote_ident, quote_literal};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use tokio_postgres::Client;

/// What a sync session did to the destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Change detection found both sides identical; nothing was touched.
    Unchanged,
    /// Destination was missing, structurally different, or force-reloaded;
    /// it was reset and fully copied.
    Recreated { rows_copied: u64 },
    /// Incremental sync: stale destination rows deleted, missing rows copied.
    Synced { rows_deleted: u64, rows_copied: u64 },
}

/// Synchronize one table from source to destination.
///
/// Schema first: a missing destination table is created from the source's
/// canonical structure; a structurally different one is dropped and
/// recreated, since hashes computed over different shapes cannot be diffed.
/// Otherwise the hash sets on both sides are compared and only the delta
/// moves: stale destination rows are deleted in batches, missing rows are
/// exported with a hash filter and bulk-loaded.
///
/// Every statement autocommits, so a session killed mid-delete leaves some
/// batches applied. Re-running converges: surviving stale rows show up in
/// the next diff and already-deleted hashes delete zero rows.
pub async fn sync_table(
    source: &Client,
    target: &Client,
    config: &SyncConfig,
    table: &str,
) -> Result<SyncOutcome> {
    if !schema::table_exists(source, table).await {
        bail!("Source table '{}' does not exist", table);
    }

    let source_structure = schema::get_table_structure(source, table)
        .await
        .with_context(|| format!("Failed to read source structure for '{}'", table))?;

    if !schema::table_exists(target, table).await {
        tracing::info!("Destination table '{}' missing, creating it", table);
        schema::create_table_with_schema(target, &source_structure)
            .await
            .with_context(|| format!("Failed to create destination table '{}'", table))?;
        let rows_copied = full_copy(source, target, config, table).await?;
        return Ok(SyncOutcome::Recreated { rows_copied });
    }

    let target_structure = schema::get_table_structure(target, table)
        .await
        .with_context(|| format!("Failed to read destination structure for '{}'", table))?;

    // Descriptors are opaque text, compared byte-for-byte
    if source_structure != target_structure {
        tracing::warn!(
            "Structure mismatch on '{}', dropping and recreating destination",
            table
        );
        schema::drop_table(target, table).await?;
        schema::create_table_with_schema(target, &source_structure)
            .await
            .with_context(|| format!("Failed to recreate destination table '{}'", table))?;
        let rows_copied = full_copy(source, target, config, table).await?;
        return Ok(SyncOutcome::Recreated { rows_copied });
    }

    if config.full_reload {
        tracing::info!("Full reload of '{}': truncating destination", table);
        mutate::truncate_table(target, table).await?;
        let rows_copied = full_copy(source, target, config, table).await?;
        return Ok(SyncOutcome::Recreated { rows_copied });
    }

    if config.change_detection && is_unchanged(source, target, config, table).await? {
        tracing::info!("Table '{}' unchanged, skipping", table);
        return Ok(SyncOutcome::Unchanged);
    }

    let source_hashes = hashes::get_current_hash_set(source, table, &config.hash_column)
        .await
        .with_context(|| format!("Failed to read source hash set for '{}'", table))?;
    let target_hashes = hashes::get_current_hash_set(target, table, &config.hash_column)
        .await
        .with_context(|| format!("Failed to read destination hash set for '{}'", table))?;

    let stale: HashSet<String> = target_hashes.difference(&source_hashes).cloned().collect();
    let missing: HashSet<String> = source_hashes.difference(&target_hashes).cloned().collect();

    tracing::info!(
        "Table '{}': {} stale row(s) to delete, {} missing row(s) to copy",
        table,
        stale.len(),
        missing.len()
    );

    let rows_deleted = mutate::delete_records(
        target,
        table,
        &config.hash_column,
        &stale,
        config.delete_batch_size,
    )
    .await
    .with_context(|| format!("Failed to delete stale rows from '{}'", table))?;

    let rows_copied = if missing.is_empty() {
        0
    } else {
        let filter = hash_filter(&config.hash_column, &missing);
        copy_rows(source, target, config, table, Some(&filter)).await?
    };

    Ok(SyncOutcome::Synced {
        rows_deleted,
        rows_copied,
    })
}

/// Change-detection fast path: equal row counts and equal max-modified
/// timestamps on both sides mean the table can be skipped. Tables without
/// the tracked column report `Unavailable` and always fall through to the
/// full diff.
async fn is_unchanged(
    source: &Client,
    target: &Client,
    config: &SyncConfig,
    table: &str,
) -> Result<bool> {
    use self::stats::MaxModified;

    let source_modified =
        stats::get_table_max_modified(source, table, &config.modified_column).await;
    let target_modified =
        stats::get_table_max_modified(target, table, &config.modified_column).await;

    match (source_modified, target_modified) {
        (MaxModified::At(s), MaxModified::At(t)) if s == t => {
            let source_count = stats::get_row_count(source, table).await?;
            let target_count = stats::get_row_count(target, table).await?;
            Ok(source_count == target_count)
        }
        _ => Ok(false),
    }
}

/// Build a row filter selecting exactly the rows whose hash is in `hashes`.
fn hash_filter(hash_column: &str, hashes: &HashSet<String>) -> String {
    let mut members: Vec<&str> = hashes.iter().map(String::as_str).collect();
    members.sort_unstable(); // deterministic statement text
    let list: Vec<String> = members.iter().map(|h| quote_literal(h)).collect();
    format!("{} IN ({})", quote_ident(hash_column), list.join(", "))
}

async fn full_copy(
    source: &Client,
    target: &Client,
    config: &SyncConfig,
    table: &str,
) -> Result<u64> {
    copy_rows(source, target, config, table, None).await
}

/// Export (optionally filtered) rows from source and bulk-load them into the
/// destination. The dump file is removed after a successful import; on
/// failure it is left behind for inspection.
async fn copy_rows(
    source: &Client,
    target: &Client,
    config: &SyncConfig,
    table: &str,
    filter: Option<&str>,
) -> Result<u64> {
    let columns = schema::list_columns(source, table).await?;
    let dump_path = bulk::export_to_file(source, table, filter, &config.dump_dir)
        .await
        .with_context(|| format!("Failed to export '{}'", table))?;

    let rows_copied = bulk::import_from_file(target, table, &columns, &dump_path)
        .await
        .with_context(|| format!("Failed to import '{}'", table))?;

    if let Err(e) = tokio::fs::remove_file(&dump_path).await {
        tracing::warn!("Failed to remove dump file {}: {}", dump_path.display(), e);
    }

    Ok(rows_copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_filter_single_member() {
        let hashes: HashSet<String> = ["abc".to_string()].into_iter().collect();
        assert_eq!(hash_filter("field_hash", &hashes), "\"field_hash\" IN ('abc')");
    }

    #[test]
    fn test_hash_filter_is_deterministic() {
        let hashes: HashSet<String> = ["b", "a", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            hash_filter("field_hash", &hashes),
            "\"field_hash\" IN ('a', 'b', 'c')"
        );
    }

    #[test]
    fn test_hash_filter_escapes_quotes() {
        let hashes: HashSet<String> = ["o'hash".to_string()].into_iter().collect();
        assert_eq!(
            hash_filter("field_hash", &hashes),
            "\"field_hash\" IN ('o''hash')"
        );
    }
}
