// ABOUTME: Table statistics for change-detection heuristics
// ABOUTME: Row counts and max last-modified timestamps with an out-of-band sentinel

use crate::utils::quote_ident;
use anyhow::{Context, Result};
use std::time::SystemTime;
use tokio_postgres::Client;

/// Result of a max-modified probe.
///
/// `Unavailable` is the sentinel for tables that lack the tracked column,
/// are empty, or cannot satisfy the query. It is distinguishable from every
/// valid timestamp, so callers can probe whether a table is change-tracked
/// without error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxModified {
    At(SystemTime),
    Unavailable,
}

impl MaxModified {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, MaxModified::Unavailable)
    }
}

/// Exact row count at call time.
pub async fn get_row_count(client: &Client, table: &str) -> Result<i64> {
    let query = format!("SELECT count(*) FROM {}", quote_ident(table));
    let row = client
        .query_one(&query, &[])
        .await
        .with_context(|| format!("Failed to count rows of '{}'", table))?;
    Ok(row.get(0))
}

/// Maximum value of the tracked last-modified column.
///
/// Never raises: a missing column, missing table, empty table, or any other
/// query failure normalizes to `MaxModified::Unavailable`.
pub async fn get_table_max_modified(
    client: &Client,
    table: &str,
    modified_column: &str,
) -> MaxModified {
    let query = format!(
        "SELECT max({}) FROM {}",
        quote_ident(modified_column),
        quote_ident(table)
    );

    match client.query_one(&query, &[]).await {
        Ok(row) => match row.try_get::<_, Option<SystemTime>>(0) {
            Ok(Some(ts)) => MaxModified::At(ts),
            _ => MaxModified::Unavailable,
        },
        Err(e) => {
            tracing::debug!(
                "max({}) unavailable on '{}': {}",
                modified_column,
                table,
                e
            );
            MaxModified::Unavailable
        }
    }
}
